//! Content listing and editing.
//!
//! Listing is public. Writes need an admin session whose status has been
//! confirmed by the authoritative check; the optimistic hint alone is not
//! enough.

use chapter_core::{EntityId, Fields, SortSpec};
use chapter_site::auth::GuardDecision;
use chapter_site::entities::{Collection, Entities};

use super::session::settle;
use super::{CliError, Context, print_json};

fn collection<'a>(entities: &'a Entities, name: &str) -> Result<&'a Collection, CliError> {
    entities
        .content(name)
        .ok_or_else(|| CliError::UnknownCollection(name.to_owned()))
}

fn parse_fields(json: &str) -> Result<Fields, CliError> {
    Ok(serde_json::from_str(json)?)
}

async fn require_admin(ctx: &Context) -> Result<(), CliError> {
    let session = ctx.session("content editing").await?;
    let state = settle(session).await;

    match state.guard().decision() {
        GuardDecision::Allow => {
            if let Some(user) = state.user() {
                tracing::debug!(uid = %user.uid, "Admin session confirmed");
            }
            Ok(())
        }
        GuardDecision::Deny | GuardDecision::Pending => Err(CliError::NotAuthorized),
    }
}

/// Print a collection, optionally sorted.
pub async fn list(ctx: &Context, name: &str, sort: Option<&str>) -> Result<(), CliError> {
    let entities = ctx.entities();
    let target = collection(&entities, name)?;
    let sort = sort.map(SortSpec::parse).transpose()?;

    let listed = target.list(sort.as_ref()).await;
    print_json(&serde_json::to_value(listed)?)
}

/// Create an entity and print it with its new id.
pub async fn create(ctx: &Context, name: &str, json: &str) -> Result<(), CliError> {
    let fields = parse_fields(json)?;
    require_admin(ctx).await?;

    let entities = ctx.entities();
    let created = collection(&entities, name)?.create(fields).await?;
    tracing::info!(collection = name, id = %created.id, "Created");
    print_json(&serde_json::to_value(created)?)
}

/// Merge fields into an entity and print the result.
pub async fn update(ctx: &Context, name: &str, id: &str, json: &str) -> Result<(), CliError> {
    let fields = parse_fields(json)?;
    require_admin(ctx).await?;

    let entities = ctx.entities();
    let updated = collection(&entities, name)?
        .update(&EntityId::new(id), fields)
        .await?;
    tracing::info!(collection = name, id, "Updated");
    print_json(&serde_json::to_value(updated)?)
}

/// Delete an entity; deleting a missing id succeeds.
pub async fn delete(ctx: &Context, name: &str, id: &str) -> Result<(), CliError> {
    require_admin(ctx).await?;

    let entities = ctx.entities();
    let deleted = collection(&entities, name)?
        .delete(&EntityId::new(id))
        .await?;
    tracing::info!(collection = name, id = %deleted, "Deleted");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_requires_object() {
        let fields = parse_fields(r#"{"title": "Meeting", "date": "2025-01-01"}"#).unwrap();
        assert_eq!(fields.len(), 2);

        assert!(matches!(
            parse_fields(r#"["not", "an", "object"]"#),
            Err(CliError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_only_content_collections_are_addressable() {
        let entities = Entities::in_memory();
        assert!(collection(&entities, "events").is_ok());
        assert!(matches!(
            collection(&entities, "admins"),
            Err(CliError::UnknownCollection(_))
        ));
    }
}
