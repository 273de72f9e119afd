//! BloodNet CLI
//!
//! Command-line client of the BloodNet API:
//! - Register, sign in and out (the id token is kept in the user config dir)
//! - Browse and filter requests, donate and undo
//! - Admin dashboard, request creation and CSV export
//! - Profile management

use anyhow::Context;
use bloodnet::backend::AuthUser;
use bloodnet::client::{ApiClient, ClientConfig, ClientError};
use bloodnet::forms::{ProfileForm, RequestForm};
use bloodnet::model::{BloodRequest, BloodType, RequestFilter, Role, Selection, Urgency};
use bloodnet::views::{AdminPage, AdminView, DonorPage, DonorView, Notification, Portal};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bloodnet-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Connect blood donors with hospitals in need")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Register {
        email: String,
        password: String,
        /// donor or admin
        #[arg(short, long, default_value = "donor")]
        role: Role,
    },

    /// Sign in and remember the session
    Login { email: String, password: String },

    /// Sign out and forget the session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// List blood requests
    Requests {
        /// Blood type filter (e.g. O-, AB+, All)
        #[arg(short, long, default_value = "All")]
        blood_type: String,
        /// Urgency filter (High, Medium, Low, All)
        #[arg(short, long, default_value = "All")]
        urgency: String,
    },

    /// Post a blood request (admin)
    Create {
        #[arg(long)]
        patient: String,
        #[arg(long)]
        hospital: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        blood_type: String,
        #[arg(long, default_value = "1")]
        units: i64,
        #[arg(long, default_value = "Medium")]
        urgency: String,
    },

    /// Claim a request (donor)
    Donate { id: String },

    /// Revert a claimed donation
    Undo { id: String },

    /// Requests you donated to
    History,

    /// Pending and fulfilled requests (admin)
    Dashboard,

    /// Export all requests as CSV (admin)
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show your profile
    Profile,

    /// Update your profile
    ProfileSet {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        blood_group: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        last_donation_date: Option<String>,
        #[arg(long)]
        available_for_emergency: Option<bool>,
        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Follow the request list as it changes
    Watch {
        /// Poll interval in seconds
        #[arg(short, long, default_value = "2")]
        interval: u64,
    },

    /// Show server status
    Status,

    /// Generate default server config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Signed-in session kept between invocations
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    api_url: String,
    uid: String,
    email: String,
    role: Role,
    id_token: String,
}

fn session_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bloodnet")
        .join("session.json")
}

fn load_session(api_url: &str) -> Option<StoredSession> {
    let content = std::fs::read_to_string(session_path()).ok()?;
    let session: StoredSession = serde_json::from_str(&content).ok()?;
    (session.api_url == api_url).then_some(session)
}

fn save_session(session: &StoredSession) -> anyhow::Result<()> {
    let path = session_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(session)?)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Portal for the stored session, signed in
fn portal_for(session: Option<&StoredSession>) -> Portal {
    let mut portal = Portal::default();
    if let Some(session) = session {
        portal.select(session.role);
        let user = Some(AuthUser {
            uid: session.uid.clone(),
            email: session.email.clone(),
        });
        match &mut portal {
            Portal::Donor(view) => view.on_auth_state(user),
            Portal::Admin(view) => view.on_auth_state(user),
            Portal::RoleSelection => {}
        }
    }
    portal
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let session = load_session(&cli.api_url);
    let mut client = ApiClient::new(ClientConfig {
        base_url: cli.api_url.clone(),
        ..Default::default()
    })?
    .with_token(session.as_ref().map(|s| s.id_token.clone()));
    let mut portal = portal_for(session.as_ref());

    let result = run(&cli, &mut client, &mut portal, json).await;
    if let Err(e) = result {
        match e.downcast_ref::<ClientError>() {
            Some(ClientError::Unavailable(url)) => {
                eprintln!("Cannot connect to BloodNet API at {}", url);
                eprintln!();
                eprintln!("Make sure the BloodNet server is running:");
                eprintln!("  cargo run --bin bloodnet");
            }
            Some(err) if err.is_unauthorized() => {
                eprintln!("{}", err);
                eprintln!("Sign in with: bloodnet-cli login <email> <password>");
            }
            _ => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    cli: &Cli,
    client: &mut ApiClient,
    portal: &mut Portal,
    json: bool,
) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Register {
            email,
            password,
            role,
        } => {
            let response = client.register(email, password, *role).await?;
            if json {
                print_json(&response)?;
            } else {
                println!("{}", response.message);
                println!("  uid:  {}", response.uid);
                println!("  role: {}", response.role);
            }
        }

        Commands::Login { email, password } => {
            let response = client.login(email, password).await?;
            let profile = &response.profile;
            save_session(&StoredSession {
                api_url: cli.api_url.clone(),
                uid: profile.uid.clone(),
                email: profile.email.clone(),
                role: profile.role,
                id_token: response.id_token.clone(),
            })?;

            portal.select(profile.role);
            println!("Signed in to {} as {}", portal.brand(), profile.email);
        }

        Commands::Logout => {
            if client.token().is_some() {
                // The server may have restarted; forget the token regardless
                if let Err(e) = client.logout().await {
                    tracing::debug!(error = %e, "Server logout failed");
                }
            }
            let path = session_path();
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            println!("Signed out");
        }

        Commands::Whoami => {
            let me = client.me().await?;
            if json {
                print_json(&me)?;
            } else {
                println!("{} ({})", me.email, me.role);
                println!("  uid:  {}", me.uid);
                if !me.profile.full_name.is_empty() {
                    println!("  name: {}", me.profile.full_name);
                }
            }
        }

        Commands::Requests {
            blood_type,
            urgency,
        } => {
            let filter = RequestFilter::new(
                blood_type
                    .parse::<Selection<BloodType>>()
                    .map_err(anyhow::Error::msg)?,
                urgency
                    .parse::<Selection<Urgency>>()
                    .map_err(anyhow::Error::msg)?,
            );
            let requests = client.list_requests(&RequestFilter::default()).await?;

            let mut view = DonorView::new();
            view.on_auth_state(signed_in_user(portal));
            view.on_snapshot(requests);
            view.set_filter(filter);

            if json {
                print_json(&view.cards())?;
            } else if let Some(message) = view.empty_message() {
                println!("{}", message);
            } else {
                print_requests(&view.visible_requests());
            }
        }

        Commands::Create {
            patient,
            hospital,
            address,
            location,
            blood_type,
            units,
            urgency,
        } => {
            let form = RequestForm {
                patient_name: patient.clone(),
                hospital: hospital.clone(),
                hospital_address: address.clone(),
                location: location.clone(),
                blood_type: blood_type.clone(),
                units: *units,
                urgency: urgency.clone(),
            };

            let mut view = AdminView::new();
            view.on_auth_state(signed_in_user(portal));
            view.navigate(AdminPage::CreateRequest);
            view.begin_submit();

            let result = client.create_request(&form).await;
            let created = result.as_ref().ok().cloned();
            let error = result.as_ref().err().map(|e| e.to_string());
            view.create_finished(result.map(|_| ()), Utc::now());

            print_notification(view.notification.visible(Utc::now()), error.as_deref());
            if let Some(request) = created {
                println!("  id: {}", request.id);
            }
        }

        Commands::Donate { id } => {
            let request = client.get_request(id).await?;

            let mut view = DonorView::new();
            view.on_auth_state(signed_in_user(portal));
            view.on_snapshot(vec![request]);

            if !view.open_modal(id) {
                println!("Donation already confirmed for request {}", id);
                return Ok(());
            }
            let Some(claim_id) = view.confirm_modal() else {
                return Ok(());
            };

            let result = client.donate(&claim_id).await;
            let error = result.as_ref().err().map(|e| e.to_string());
            view.donation_finished(result.map(|_| ()), Utc::now());
            print_notification(view.notification.visible(Utc::now()), error.as_deref());
        }

        Commands::Undo { id } => {
            let mut view = DonorView::new();
            view.on_auth_state(signed_in_user(portal));

            let result = client.undo_donation(id).await;
            let error = result.as_ref().err().map(|e| e.to_string());
            view.undo_finished(result.map(|_| ()), Utc::now());
            print_notification(view.notification.visible(Utc::now()), error.as_deref());
        }

        Commands::History => {
            let history = client.history().await?;

            let mut view = DonorView::new();
            view.on_auth_state(signed_in_user(portal));
            view.navigate(DonorPage::History);
            view.on_history(history);

            if json {
                print_json(&view.history)?;
            } else if view.history.is_empty() {
                println!("No donations yet.");
            } else {
                println!("{:<24} {:<6} {:<28} {}", "Donated", "Type", "Hospital", "Patient");
                println!("{}", "-".repeat(80));
                for request in &view.history {
                    let when = request
                        .donation
                        .as_ref()
                        .and_then(|d| d.donation_timestamp)
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<24} {:<6} {:<28} {}",
                        when, request.blood_type, request.hospital, request.patient_name
                    );
                }
            }
        }

        Commands::Dashboard => {
            let dashboard = client.dashboard().await?;

            let mut view = AdminView::new();
            view.on_auth_state(signed_in_user(portal));
            view.on_snapshot(dashboard.requests);
            let (pending, fulfilled) = view.counts();

            if json {
                print_json(&view.cards())?;
            } else {
                println!("Pending: {}  Fulfilled: {}", pending, fulfilled);
                println!();
                println!(
                    "{:<22} {:<6} {:<28} {:<8} {:<10} {}",
                    "ID", "Type", "Hospital", "Urgency", "Status", "Donor"
                );
                println!("{}", "-".repeat(96));
                for card in view.cards() {
                    println!(
                        "{:<22} {:<6} {:<28} {:<8} {:<10} {}",
                        card.header.request_id,
                        card.header.blood_type,
                        card.header.hospital,
                        card.header.urgency,
                        card.badge,
                        card.donor.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Export { output } => {
            let data = client.export_csv().await?;
            match output {
                Some(path) => {
                    std::fs::write(path, &data)?;
                    println!("Exported to {:?}", path);
                }
                None => print!("{}", data),
            }
        }

        Commands::Profile => {
            let profile = client.profile().await?;
            if json {
                print_json(&profile)?;
            } else {
                println!("{} ({})", profile.email, profile.role);
                println!("  Name:        {}", or_dash(&profile.full_name));
                println!(
                    "  Blood group: {}",
                    profile
                        .blood_group
                        .map(|b| b.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
                println!("  City:        {}", or_dash(&profile.city));
                println!("  Phone:       {}", or_dash(&profile.phone));
                println!(
                    "  Last donated: {}",
                    profile
                        .last_donation_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
                println!(
                    "  Emergency:   {}",
                    if profile.available_for_emergency { "available" } else { "no" }
                );
            }
        }

        Commands::ProfileSet {
            full_name,
            blood_group,
            city,
            phone,
            last_donation_date,
            available_for_emergency,
            photo_url,
        } => {
            let form = ProfileForm {
                full_name: full_name.clone(),
                blood_group: blood_group.clone(),
                city: city.clone(),
                phone: phone.clone(),
                last_donation_date: last_donation_date.clone(),
                available_for_emergency: *available_for_emergency,
                photo_url: photo_url.clone(),
            };

            let mut view = DonorView::new();
            view.on_auth_state(signed_in_user(portal));
            view.navigate(DonorPage::Profile);

            let result = client.update_profile(&form).await;
            let error = result.as_ref().err().map(|e| e.to_string());
            view.profile_saved(result, Utc::now());
            print_notification(view.notification.visible(Utc::now()), error.as_deref());
        }

        Commands::Watch { interval } => {
            let mut view = DonorView::new();
            view.on_auth_state(signed_in_user(portal));
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs((*interval).max(1)));

            println!("Watching requests (Ctrl+C to stop)");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tokio::signal::ctrl_c() => break,
                }

                let requests = client.list_requests(&RequestFilter::default()).await?;
                if requests == view.requests {
                    continue;
                }
                view.on_snapshot(requests);

                println!();
                println!("[{}] {} requests", Utc::now().format("%H:%M:%S"), view.requests.len());
                print_requests(&view.requests);
            }
        }

        Commands::Status => {
            let health = client.health().await?;
            if json {
                print_json(&health)?;
            } else {
                println!("BloodNet v{}", health.version);
                println!();
                println!("API Status: {}", health.status);
                println!();
                println!("Backend:");
                println!("  Store:    {} ({})", health.store.backend, health.store.status);
                if let Some(error) = &health.store.error {
                    println!("            {}", error);
                }
                println!("  Identity: {}", health.identity);
                println!();
                println!("Feed:");
                println!("  Requests: {}", health.feed.request_count);
                if let Some(at) = health.feed.last_refresh {
                    println!("  Refreshed: {}", at.format("%Y-%m-%d %H:%M:%S"));
                }
                println!();
                println!("WebSocket clients: {}", health.websocket_connections);
                println!("Uptime: {}", format_duration(health.uptime_seconds));
            }
        }

        Commands::Config { output } => {
            let config = bloodnet::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", config),
            }
        }
    }

    Ok(())
}

fn signed_in_user(portal: &Portal) -> Option<AuthUser> {
    match portal {
        Portal::Donor(view) => view.user.clone(),
        Portal::Admin(view) => view.user.clone(),
        Portal::RoleSelection => None,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_notification(notification: Option<&Notification>, detail: Option<&str>) {
    let Some(notification) = notification else {
        return;
    };
    if notification.is_error() {
        eprintln!("{}", notification.message);
        if let Some(detail) = detail {
            eprintln!("  {}", detail);
        }
    } else {
        println!("{}", notification.message);
    }
}

fn print_requests(requests: &[BloodRequest]) {
    println!(
        "{:<22} {:<6} {:<28} {:<22} {:<8} {:>5}  {}",
        "ID", "Type", "Hospital", "Patient", "Urgency", "Units", "Status"
    );
    println!("{}", "-".repeat(110));
    for request in requests {
        let status = if request.is_donated() {
            "Donation Confirmed!"
        } else {
            "Active"
        };
        println!(
            "{:<22} {:<6} {:<28} {:<22} {:<8} {:>5}  {}",
            request.id,
            request.blood_type,
            request.hospital,
            request.patient_name,
            request.urgency,
            request.units,
            status
        );
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
