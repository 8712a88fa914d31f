use crate::domain::catalog::{FieldValue, NewProduct, ProductField};
use crate::domain::money::Amount;
use crate::domain::ports::{CatalogStoreRef, SessionStoreRef};
use crate::domain::session::{WizardKind, WizardSession};
use crate::error::{Result, ShopError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One question in a wizard: which field it fills, what to ask, and how to
/// parse the raw answer.
struct StepDef {
    field: &'static str,
    prompt: &'static str,
    parser: StepParser,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StepParser {
    /// Non-empty text.
    Text,
    /// Decimal price text, converted to minor units.
    Price,
    /// Non-negative integer.
    Stock,
    /// Comma-separated ordered set.
    List,
    /// Category name; looked up and auto-created if absent.
    CategoryName,
    /// Numeric id that must resolve to an existing product.
    ProductId,
    /// Numeric id, taken as-is.
    Id,
    /// One of the editable-field allow-list names.
    FieldName,
    /// Parsed according to the field chosen at the `field` step.
    ValueForChosenField,
}

const ADD_PRODUCT: &[StepDef] = &[
    StepDef { field: "name", prompt: "Product name:", parser: StepParser::Text },
    StepDef { field: "category", prompt: "Category:", parser: StepParser::CategoryName },
    StepDef { field: "price", prompt: "Price:", parser: StepParser::Price },
    StepDef { field: "description", prompt: "Description:", parser: StepParser::Text },
    StepDef { field: "sizes", prompt: "Sizes (comma-separated):", parser: StepParser::List },
    StepDef { field: "colors", prompt: "Colors (comma-separated):", parser: StepParser::List },
    StepDef { field: "stock", prompt: "Stock quantity:", parser: StepParser::Stock },
    StepDef { field: "photo", prompt: "Photo (URL or file id):", parser: StepParser::Text },
];

const EDIT_PRODUCT: &[StepDef] = &[
    StepDef { field: "id", prompt: "Product id to edit:", parser: StepParser::ProductId },
    StepDef {
        field: "field",
        prompt: "Field to edit (name, price, description, sizes, colors, stock, photo):",
        parser: StepParser::FieldName,
    },
    StepDef { field: "new_value", prompt: "New value:", parser: StepParser::ValueForChosenField },
];

const DELETE_PRODUCT: &[StepDef] = &[StepDef {
    field: "id",
    prompt: "Product id to delete:",
    parser: StepParser::Id,
}];

const DELETE_CATEGORY: &[StepDef] = &[StepDef {
    field: "id",
    prompt: "Category id to delete:",
    parser: StepParser::Id,
}];

fn steps_for(kind: WizardKind) -> &'static [StepDef] {
    match kind {
        WizardKind::AddProduct => ADD_PRODUCT,
        WizardKind::EditProduct => EDIT_PRODUCT,
        WizardKind::DeleteProduct => DELETE_PRODUCT,
        WizardKind::DeleteCategory => DELETE_CATEGORY,
    }
}

/// What the caller should do next after feeding input to a wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    /// Ask the next question.
    Prompt { text: String },
    /// Input rejected; ask the same question again. Session unchanged.
    Reprompt { text: String },
    /// The wizard committed and the session is gone.
    Done { text: String },
}

/// Generic per-user step machine driving the catalog administration flows.
///
/// Advances for the same user are serialized through a per-user mutex;
/// different users never contend.
pub struct WizardEngine {
    catalog: CatalogStoreRef,
    sessions: SessionStoreRef,
    user_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl WizardEngine {
    pub fn new(catalog: CatalogStoreRef, sessions: SessionStoreRef) -> Self {
        Self {
            catalog,
            sessions,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock();
        Arc::clone(locks.entry(user_id).or_default())
    }

    /// Starts `kind` for the user, replacing any active wizard
    /// (last-start-wins).
    pub async fn start(&self, user_id: i64, kind: WizardKind) -> Result<WizardOutcome> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.sessions.put(WizardSession::new(user_id, kind)).await?;
        tracing::info!(user_id, ?kind, "wizard started");
        Ok(WizardOutcome::Prompt {
            text: steps_for(kind)[0].prompt.to_string(),
        })
    }

    /// Feeds the user's raw input to their current step.
    ///
    /// Malformed input re-prompts and leaves the session untouched; any other
    /// failure clears the session before propagating, so a user is never left
    /// stuck in a half-broken wizard.
    pub async fn advance(&self, user_id: i64, input: &str) -> Result<WizardOutcome> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let Some(mut session) = self.sessions.get(user_id).await? else {
            return Err(ShopError::NoActiveSession(user_id));
        };
        let steps = steps_for(session.kind);
        let Some(step) = steps.get(session.step) else {
            self.sessions.remove(user_id).await?;
            return Err(ShopError::Internal(format!(
                "session for user {user_id} points past the last step"
            )));
        };

        let value = match self.parse_step(step, input, &session.fields).await {
            Ok(value) => value,
            Err(ShopError::ValidationFailed(reason)) => {
                tracing::debug!(user_id, step = step.field, %reason, "wizard input rejected");
                return Ok(WizardOutcome::Reprompt {
                    text: format!("{reason}. {}", step.prompt),
                });
            }
            Err(e) => {
                tracing::warn!(user_id, step = step.field, error = %e, "wizard aborted");
                self.sessions.remove(user_id).await?;
                return Err(e);
            }
        };

        session.fields.insert(step.field.to_string(), value);
        session.step += 1;

        if session.step == steps.len() {
            let committed = self.commit(&session).await;
            self.sessions.remove(user_id).await?;
            let text = committed.inspect_err(
                |e| tracing::warn!(user_id, kind = ?session.kind, error = %e, "wizard commit failed"),
            )?;
            Ok(WizardOutcome::Done { text })
        } else {
            let next = &steps[session.step];
            let prompt = next.prompt.to_string();
            self.sessions.put(session).await?;
            Ok(WizardOutcome::Prompt { text: prompt })
        }
    }

    /// Clears the user's session unconditionally.
    pub async fn cancel(&self, user_id: i64) -> Result<()> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.sessions.remove(user_id).await
    }

    async fn parse_step(
        &self,
        step: &StepDef,
        raw: &str,
        fields: &HashMap<String, FieldValue>,
    ) -> Result<FieldValue> {
        match step.parser {
            StepParser::Text => Ok(FieldValue::Text(non_empty(raw)?)),
            StepParser::Price => Ok(FieldValue::Money(Amount::from_decimal_str(raw)?)),
            StepParser::Stock => ProductField::Stock.parse_value(raw),
            StepParser::List => {
                let list = crate::domain::catalog::split_list(raw);
                if list.is_empty() {
                    return Err(ShopError::ValidationFailed(
                        "expected a comma-separated list".to_string(),
                    ));
                }
                Ok(FieldValue::List(list))
            }
            StepParser::CategoryName => {
                let name = non_empty(raw)?;
                let category = match self.catalog.category_by_name(&name).await? {
                    Some(category) => category,
                    None => self.catalog.create_category(&name).await?,
                };
                Ok(FieldValue::Id(category.id))
            }
            StepParser::Id => Ok(FieldValue::Id(parse_id(raw)?)),
            StepParser::ProductId => {
                let id = parse_id(raw)?;
                // A miss here aborts the wizard rather than re-prompting.
                self.catalog.product(id).await?;
                Ok(FieldValue::Id(id))
            }
            StepParser::FieldName => {
                let field = raw.parse::<ProductField>().map_err(|_| {
                    ShopError::ValidationFailed(format!(
                        "{:?} is not an editable field",
                        raw.trim()
                    ))
                })?;
                Ok(FieldValue::Field(field))
            }
            StepParser::ValueForChosenField => {
                let Some(FieldValue::Field(field)) = fields.get("field") else {
                    return Err(ShopError::Internal(
                        "edit wizard reached new_value without a field".to_string(),
                    ));
                };
                field.parse_value(raw)
            }
        }
    }

    async fn commit(&self, session: &WizardSession) -> Result<String> {
        match session.kind {
            WizardKind::AddProduct => {
                let new = NewProduct {
                    name: take_text(session, "name")?,
                    category_id: take_id(session, "category")?,
                    price: take_money(session, "price")?,
                    description: take_text(session, "description")?,
                    sizes: take_list(session, "sizes")?,
                    colors: take_list(session, "colors")?,
                    stock: take_count(session, "stock")?,
                    photo: take_text(session, "photo")?,
                };
                let product = self.catalog.create_product(new).await?;
                tracing::info!(user_id = session.user_id, product_id = product.id, "product created");
                Ok(format!("Product {} created.", product.id))
            }
            WizardKind::EditProduct => {
                let id = take_id(session, "id")?;
                let field = take_field(session, "field")?;
                let value = take_value(session, "new_value")?;
                self.catalog.update_product_field(id, field, value).await?;
                tracing::info!(user_id = session.user_id, product_id = id, %field, "product updated");
                Ok(format!("Product {id} updated."))
            }
            WizardKind::DeleteProduct => {
                let id = take_id(session, "id")?;
                self.catalog.delete_product(id).await?;
                tracing::info!(user_id = session.user_id, product_id = id, "product deleted");
                Ok(format!("Product {id} deleted."))
            }
            WizardKind::DeleteCategory => {
                let id = take_id(session, "id")?;
                self.catalog.delete_category(id).await?;
                tracing::info!(user_id = session.user_id, category_id = id, "category deleted");
                Ok(format!("Category {id} deleted."))
            }
        }
    }
}

fn non_empty(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ShopError::ValidationFailed(
            "expected non-empty text".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ShopError::ValidationFailed(format!("{:?} is not a numeric id", raw.trim())))
}

fn take(session: &WizardSession, name: &str) -> Result<FieldValue> {
    session.fields.get(name).cloned().ok_or_else(|| {
        ShopError::Internal(format!("wizard field {name} was never collected"))
    })
}

fn take_text(session: &WizardSession, name: &str) -> Result<String> {
    match take(session, name)? {
        FieldValue::Text(v) => Ok(v),
        other => Err(mistyped(name, &other)),
    }
}

fn take_id(session: &WizardSession, name: &str) -> Result<i64> {
    match take(session, name)? {
        FieldValue::Id(v) => Ok(v),
        other => Err(mistyped(name, &other)),
    }
}

fn take_money(session: &WizardSession, name: &str) -> Result<Amount> {
    match take(session, name)? {
        FieldValue::Money(v) => Ok(v),
        other => Err(mistyped(name, &other)),
    }
}

fn take_count(session: &WizardSession, name: &str) -> Result<u32> {
    match take(session, name)? {
        FieldValue::Count(v) => Ok(v),
        other => Err(mistyped(name, &other)),
    }
}

fn take_list(session: &WizardSession, name: &str) -> Result<Vec<String>> {
    match take(session, name)? {
        FieldValue::List(v) => Ok(v),
        other => Err(mistyped(name, &other)),
    }
}

fn take_field(session: &WizardSession, name: &str) -> Result<ProductField> {
    match take(session, name)? {
        FieldValue::Field(v) => Ok(v),
        other => Err(mistyped(name, &other)),
    }
}

fn take_value(session: &WizardSession, name: &str) -> Result<FieldValue> {
    take(session, name)
}

fn mistyped(name: &str, value: &FieldValue) -> ShopError {
    ShopError::Internal(format!("wizard field {name} holds unexpected {value:?}"))
}
