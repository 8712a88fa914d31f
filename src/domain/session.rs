use crate::domain::catalog::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The guided admin conversations the wizard engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardKind {
    AddProduct,
    EditProduct,
    DeleteProduct,
    DeleteCategory,
}

/// Per-user wizard state: which wizard, which step, and the values collected
/// so far. At most one session exists per user; starting a new wizard
/// replaces it, and any terminal transition destroys it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub user_id: i64,
    pub kind: WizardKind,
    pub step: usize,
    pub fields: HashMap<String, FieldValue>,
}

impl WizardSession {
    pub fn new(user_id: i64, kind: WizardKind) -> Self {
        Self {
            user_id,
            kind,
            step: 0,
            fields: HashMap::new(),
        }
    }
}
