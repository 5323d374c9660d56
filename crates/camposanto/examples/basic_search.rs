//! Basic record search functionality
//!
//! This example demonstrates the fundamental search operations:
//! - Creating a coordinator over the sample records store
//! - Name searches, date filters and cemetery filters
//! - Reading resolved locations off the results

use camposanto::{
    FilterMode, PipelineConfigBuilder, ResolvedRecord, SearchCoordinator, SearchParams, SortKey,
    camposanto_store::sample_store,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let config = PipelineConfigBuilder::immediate().page_size(5).build();
        let search = SearchCoordinator::new(sample_store()?, config);

        println!("Everyone, first page:");
        let state = search.run_now(SearchParams::default()).await;
        print_results(&state.results, state.total_count);

        println!("\nSearching for 'ro':");
        let state = search.run_now(SearchParams::new("ro")).await;
        print_results(&state.results, state.total_count);

        println!("\nDied this year, most recent first:");
        let params = SearchParams::default()
            .filter_by(FilterMode::ThisYear)
            .sort_by(SortKey::DeathDateDesc);
        let state = search.run_now(params).await;
        print_results(&state.results, state.total_count);

        println!("\nCemetery 'Cimitero di Rma' (typo tolerated):");
        let state = search
            .run_now(SearchParams::default().cemetery_name("Cimitero di Rma"))
            .await;
        print_results(&state.results, state.total_count);

        if let Some(error) = state.error {
            return Err(error.into());
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn print_results(results: &[ResolvedRecord], total_count: usize) {
    for (i, result) in results.iter().enumerate() {
        let died = result
            .record
            .death_date
            .map_or_else(|| "unknown".to_string(), |d| d.to_string());
        println!("  {}. {} (died {died})", i + 1, result);
    }

    if total_count > results.len() {
        println!("  ... {} matching records in total", total_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_env() {
        let _ = camposanto::init_logging(tracing::Level::WARN);
    }

    #[test]
    fn test_basic_search_example() {
        setup_test_env();
        assert!(
            main().is_ok(),
            "Basic search example should run successfully"
        );
    }
}
