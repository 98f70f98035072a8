//! Login, registration and logout.

use tracing::info;

use fleetsync_config::Config;
use fleetsync_protocols::types::{LoginCredentials, RegisterData, UserRole};

use crate::services::Services;

pub(crate) async fn login(config: &Config, username: String, password: String) -> Result<(), Box<dyn std::error::Error>> {
    let services = Services::build(config)?;
    let auth = services
        .api
        .login(&LoginCredentials { username, password })
        .await?;

    println!(
        "Logged in as {} ({})",
        auth.user.username,
        role_name(auth.user.role)
    );
    println!("Tokens stored in {}", services.credentials.path().display());
    Ok(())
}

pub(crate) async fn register(
    config: &Config,
    data: RegisterData,
) -> Result<(), Box<dyn std::error::Error>> {
    let services = Services::build(config)?;
    let auth = services.api.register(&data).await?;
    println!(
        "Registered {} ({})",
        auth.user.username,
        role_name(auth.user.role)
    );
    Ok(())
}

pub(crate) fn logout(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let services = Services::build(config)?;
    services.api.logout()?;
    info!(path = %services.credentials.path().display(), "Credentials cleared");
    println!("Logged out");
    Ok(())
}

fn role_name(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "admin",
        UserRole::Driver => "driver",
    }
}
