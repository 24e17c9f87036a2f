//! Account commands.

use super::{CommandError, Shop};

/// `qkart register <username> --password <password>`
///
/// # Errors
///
/// Returns a validation error or the backend's message.
#[allow(clippy::print_stdout)]
pub async fn register(
    shop: &Shop,
    username: &str,
    password: &str,
    confirm: &str,
) -> Result<(), CommandError> {
    shop.register(username, password, confirm).await?;
    println!("Registered successfully. Log in with `qkart login {username}`.");
    Ok(())
}

/// `qkart login <username> --password <password>`
///
/// # Errors
///
/// Returns a validation error or the backend's message.
#[allow(clippy::print_stdout)]
pub async fn login(shop: &Shop, username: &str, password: &str) -> Result<(), CommandError> {
    shop.login(username, password).await?;
    let session = shop.session();
    println!(
        "Logged in as {}. Wallet balance: {}",
        session.username().unwrap_or_default(),
        session.balance().unwrap_or_default()
    );
    Ok(())
}

/// `qkart logout`
///
/// # Errors
///
/// Returns an error if the state file cannot be cleared.
#[allow(clippy::print_stdout)]
pub fn logout(shop: &Shop) -> Result<(), CommandError> {
    shop.logout()?;
    println!("Logged out");
    Ok(())
}

/// `qkart whoami`
#[allow(clippy::print_stdout)]
pub fn whoami(shop: &Shop) {
    match shop.session().identity() {
        Some(identity) => {
            println!("{}", identity.username);
            println!("Wallet balance: {}", identity.balance);
            if let Some(at) = identity.logged_in_at {
                println!("Logged in since: {}", at.to_rfc2822());
            }
        }
        None => println!("Not logged in"),
    }
}
