use anyhow::{Result, bail};
use colored::Colorize;
use rustyline::DefaultEditor;

use peak_application::PeakClient;
use peak_core::user::{ProfileUpdate, UserProfile};

fn prompt_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    let mut rl = DefaultEditor::new()?;
    let password = rl.readline("Password: ")?;
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

pub async fn login(client: &PeakClient, phone_number: &str, password: Option<String>) -> Result<()> {
    let password = prompt_password(password)?;
    client.auth().login(phone_number, &password).await?;
    println!("{}", "Signed in.".bright_green());
    Ok(())
}

pub async fn register(
    client: &PeakClient,
    phone_number: &str,
    password: Option<String>,
    coach: &str,
) -> Result<()> {
    let password = prompt_password(password)?;
    client.auth().register(phone_number, &password, coach).await?;
    println!(
        "{}",
        format!("Account created. Your coach: {}", coach).bright_green()
    );
    Ok(())
}

pub async fn logout(client: &PeakClient) -> Result<()> {
    client.auth().logout().await?;
    println!("{}", "Signed out.".bright_green());
    Ok(())
}

pub async fn whoami(client: &PeakClient) -> Result<()> {
    if !client.auth().is_authenticated().await {
        println!("{}", "Not signed in.".bright_black());
        return Ok(());
    }

    let user = client.auth().current_user().await?;
    print_profile(&user);
    Ok(())
}

pub async fn update_profile(
    client: &PeakClient,
    coach: Option<String>,
    timezone: Option<String>,
) -> Result<()> {
    let update = ProfileUpdate {
        coach_selection: coach,
        timezone,
    };
    if update.is_empty() {
        bail!("pass --coach and/or --timezone");
    }
    let user = client.auth().update_profile(&update).await?;
    println!("{}", "Profile updated.".bright_green());
    print_profile(&user);
    Ok(())
}

fn print_profile(user: &UserProfile) {
    println!("{} {}", "Phone:".bright_black(), user.phone_number);
    println!("{} {}", "Coach:".bright_black(), user.coach_selection);
    if let Some(timezone) = &user.timezone {
        println!("{} {}", "Timezone:".bright_black(), timezone);
    }
}
