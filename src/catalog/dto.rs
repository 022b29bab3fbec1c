use serde::{Deserialize, Serialize};

use crate::catalog::repo::Product;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub name: String,
}

/// Type-ahead response. `superseded` means a newer query from the same user
/// replaced this one mid-flight; the client should drop the payload.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub products: Vec<Product>,
    pub superseded: bool,
}
