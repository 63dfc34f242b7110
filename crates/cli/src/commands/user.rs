//! Account management.

use super::{CliError, Context, print_json};

/// Create an email/password account and print its uid.
pub async fn create(ctx: &Context, email: &str, password: &str) -> Result<(), CliError> {
    let identity = ctx.identity("user create").await?;
    let user = identity.create_account(email, password).await?;

    tracing::info!("Account created. Grant admin access with: chapter admin grant {}", user.uid);
    print_json(&serde_json::json!({
        "uid": user.uid,
        "email": user.email,
    }))
}
