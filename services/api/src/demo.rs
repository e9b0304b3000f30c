use crate::infra::{marketplace_services, Accounts};
use clap::Args;
use rental_market::config::{AdminSeed, AuthConfig};
use rental_market::error::AppError;
use rental_market::marketplace::{
    Actor, ListingInput, MarketplaceError, NumericInput, RegistrationInput, Role, TokenIssuer,
};

const DEMO_PASSWORD: &str = "demo-password";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of listings the demo owner submits. All but the last are approved.
    #[arg(long, default_value_t = 3)]
    pub(crate) listings: usize,
    /// Print the public feed as the JSON payload served on GET /api/listings.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { listings, json } = args;
    let (accounts, market) = marketplace_services(TokenIssuer::from_config(&AuthConfig::default()));

    println!("Rental marketplace demo");
    let admin = accounts.seed_admin(&AdminSeed {
        name: "Demo Moderator".to_string(),
        email: "moderator@demo.local".to_string(),
        password: DEMO_PASSWORD.to_string(),
    })?;
    let admin = Actor::new(admin.id, Role::Admin);
    let owner = sign_up(&accounts, "Camille Owner", "camille@demo.local", Role::Owner)?;
    let tenant = sign_up(&accounts, "Theo Tenant", "theo@demo.local", Role::Tenant)?;
    println!("- Accounts: 1 admin, 1 owner, 1 tenant");

    let mut submitted = Vec::with_capacity(listings);
    for index in 1..=listings {
        let listing = market.create(&owner, demo_listing(index))?;
        println!(
            "- Submitted \"{}\" ({:.0}/month, {} m2) -> {}",
            listing.title, listing.price, listing.size, listing.status
        );
        submitted.push(listing);
    }

    match market.create(&tenant, demo_listing(listings + 1)) {
        Err(err) => println!("- Tenant submission refused: {}", err),
        Ok(listing) => println!("- Tenant unexpectedly published {}", listing.id),
    }

    let queue = market.list_pending(&admin)?;
    println!("\nModeration queue ({} pending)", queue.len());
    for entry in &queue {
        let contact = entry
            .owner
            .as_ref()
            .map(|owner| format!("{} <{}>", owner.name, owner.email))
            .unwrap_or_else(|| "unknown owner".to_string());
        println!("  - {} from {}", entry.title, contact);
    }

    let to_approve = submitted.len().saturating_sub(1);
    for listing in submitted.iter().take(to_approve) {
        let approved = market.approve(&admin, &listing.id)?;
        println!("  Approved {} -> {}", approved.id, approved.status);
    }

    let feed = market.list_public()?;
    println!("\nPublic feed ({} listings)", feed.len());
    for entry in &feed {
        let owner = entry
            .owner
            .as_ref()
            .map(|owner| owner.name.as_str())
            .unwrap_or("unknown owner");
        println!("  - {} | {} | listed by {}", entry.title, entry.address, owner);
    }

    if let Some(first) = feed.first() {
        let profile = market.add_favorite(&tenant, &first.id)?;
        println!("\nTenant favorites: {} saved", profile.favorites.len());
    }

    let pending = market.list_pending(&admin)?;
    println!("Still awaiting review: {}", pending.len());

    if json {
        match serde_json::to_string_pretty(&feed) {
            Ok(payload) => println!("\nPublic feed payload:\n{}", payload),
            Err(err) => println!("\nPublic feed payload unavailable: {}", err),
        }
    }

    Ok(())
}

fn sign_up(
    accounts: &Accounts,
    name: &str,
    email: &str,
    role: Role,
) -> Result<Actor, MarketplaceError> {
    let token = accounts.register(RegistrationInput {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password: Some(DEMO_PASSWORD.to_string()),
        role: Some(role.label().to_string()),
        ..RegistrationInput::default()
    })?;
    accounts.authenticate(&token.token)
}

fn demo_listing(index: usize) -> ListingInput {
    let rooms = index % 4 + 1;
    ListingInput {
        title: Some(format!("{rooms}-room apartment #{index}")),
        description: Some("Bright flat close to public transport.".to_string()),
        address: Some(format!("{} Rue de la République, Lyon", index * 7)),
        price: Some(NumericInput::Number(650.0 + 180.0 * rooms as f64)),
        size: Some(NumericInput::Number(22.0 + 18.0 * rooms as f64)),
        images: Some(Vec::new()),
        amenities: Some(vec!["heating".to_string()]),
    }
}
