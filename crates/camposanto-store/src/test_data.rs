//! Small realistic dataset for examples and tests.
//!
//! Rows are deliberately written in the different shapes the backend produces
//! (lowercase, uppercase and legacy Italian column names) so anything built on
//! this store also goes through the boundary adapter.

use serde_json::{Value, json};
use tracing::info;

use crate::{Result, memory::InMemoryStore};

pub fn sample_document() -> Value {
    json!({
        "cemeteries": [
            {"id": 1, "nome": "Cimitero di Roma"},
            {"ID": 2, "NOME": "Cimitero Monumentale di Milano"},
            {"id": "3", "name": "Cimitero di San Pietro"}
        ],
        "sectors": [
            {"id": 10, "nome": "Settore Nord", "cimitero_id": 1},
            {"id": 11, "nome": "Settore Sud", "cimitero_id": 1},
            {"ID": 12, "NOME": "Settore Est", "CIMITERO_ID": 2},
            {"id": 13, "name": "Settore Ovest", "cemetery_id": 3}
        ],
        "blocks": [
            {"id": 100, "nome": "Blocco A", "settore_id": 10},
            {"id": 101, "nome": "Blocco B", "settore_id": 11},
            {"ID": 102, "NOME": "Blocco C", "SETTORE_ID": 12},
            {"id": 103, "name": "Blocco D", "sector_id": 13}
        ],
        "plots": [
            {"id": 1000, "numero": 1, "fila": "I", "blocco_id": 100},
            {"id": 1001, "numero": 2, "fila": "I", "blocco_id": 100},
            {"id": 1002, "numero": 7, "fila": "II", "blocco_id": 101},
            {"ID": 1003, "NUMERO": "12", "FILA": "III", "BLOCCO_ID": 102},
            {"id": 1004, "number": "3", "row": "I", "block_id": 103}
        ],
        "deceased": [
            {"id": 1, "nome": "Mario", "cognome": "Rossi", "data_nascita": "1931-03-02",
             "data_decesso": "2024-06-01", "eta": 93, "sesso": "M", "loculo_id": 1000},
            {"id": 2, "nome": "Giulia", "cognome": "Bianchi", "data_nascita": "1940-11-20",
             "data_decesso": "2024-01-01", "eta": 83, "sesso": "F", "loculo_id": 1001},
            {"ID": 3, "NOME": "Luca", "COGNOME": "Verdi", "DATA_DECESSO": "2023-09-14",
             "SESSO": "M", "LOCULO_ID": "1002"},
            {"ID": 4, "NOME": "Anna", "COGNOME": "Ferrari", "DATA_DECESSO": "2022-02-28",
             "SESSO": "F", "LOCULO_ID": "1003", "NOTE": "Traslata dal vecchio cimitero"},
            {"id": 5, "full_name": "Paolo Esposito", "death_date": "2024-05-30T08:00:00Z",
             "sex": "male", "plot_id": 1004},
            {"id": 6, "full_name": "Sofia Romano", "death_date": "2021-12-24",
             "status": "in attesa di sepoltura"},
            {"id": 7, "full_name": "Marco Colombo", "death_date": "2020-07-04",
             "plot_id": "non assegnato"}
        ]
    })
}

/// In-memory store loaded with [`sample_document`].
pub fn sample_store() -> Result<InMemoryStore> {
    let store = InMemoryStore::from_json(sample_document())?;
    info!(records = store.len(), "Loaded sample records store");
    Ok(store)
}
