//! # Shell
//!
//! One command per line, parsed with clap. Each command maps onto a single
//! dashboard operation.
//!
//! ## Gating
//! ```text
//! line ──► parse ──► idle lock check ──► route guard ──► permission gate ──► run
//!                                            │                  │
//!                                            ▼                  ▼
//!                                    "Please log in"    "You do not have
//!                                    "Session locked"    access to ..."
//! ```

use std::io::Write;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use stockroom_client::{BootHints, ClientError, ClientResult, Dashboard, ListingController};
use stockroom_core::contract::{
    CreateRoleRequest, InboundOrderDraft, InventoryDraft, OutboundOrderDraft, ProductDraft,
    ReceiverDraft, RegisterRequest, SupplierDraft, UserDraft,
};
use stockroom_core::{
    InboundOrder, Inventory, OutboundOrder, PageState, PaginatedCollection, PermissionName, Product,
    Receiver, Resource, ResourceKind, RouteAccess, RouteDecision, Supplier, User, ValidationError,
};

// =============================================================================
// Commands
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in.
    Login { email: String, password: String },

    /// Create a business and its first user.
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        business: String,
    },

    /// Lock the session, keeping credentials.
    Lock,

    /// Unlock with the current user's password.
    Unlock { password: String },

    /// Sign out.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Toggle dark mode.
    Theme,

    /// Show a page of a resource. Pages are numbered from 1.
    List {
        resource: ResourceKind,
        page: Option<usize>,
        size: Option<usize>,
    },

    /// Next page of the last listed resource.
    Next,

    /// Previous page of the last listed resource.
    Prev,

    /// Search a resource by name.
    Search {
        resource: ResourceKind,
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Fetch one record.
    Show { resource: ResourceKind, id: String },

    /// Create a record from a JSON body.
    Create {
        resource: ResourceKind,
        #[arg(trailing_var_arg = true, required = true)]
        json: Vec<String>,
    },

    /// Update a record from a JSON body.
    Update {
        resource: ResourceKind,
        id: String,
        #[arg(trailing_var_arg = true, required = true)]
        json: Vec<String>,
    },

    /// Delete one record.
    Delete { resource: ResourceKind, id: String },

    /// List roles.
    Roles,

    /// Create a role.
    CreateRole {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a role.
    DeleteRole { name: String },

    /// Permissions held by a role.
    Perms { role: String },

    /// Grant a permission to a role.
    Grant { role: String, permission: PermissionName },

    /// Revoke a permission from a role.
    Revoke { role: String, permission: PermissionName },

    /// Every permission the business knows.
    Catalog,

    /// Re-read the signed-in role's permissions.
    Refresh,

    /// Show commands.
    Help,

    /// Leave the console.
    #[command(alias = "exit")]
    Quit,
}

impl Command {
    fn access(&self) -> RouteAccess {
        match self {
            Command::Login { .. } | Command::Register { .. } => RouteAccess::GuestOnly,
            Command::Unlock { .. }
            | Command::Logout
            | Command::Theme
            | Command::Help
            | Command::Quit => RouteAccess::Public,
            _ => RouteAccess::Protected,
        }
    }

    /// Permissions of which any one admits the command.
    fn required(&self) -> Vec<PermissionName> {
        match self {
            Command::List { resource, .. }
            | Command::Search { resource, .. }
            | Command::Show { resource, .. } => vec![resource.view_permission()],
            Command::Create { resource, .. } => vec![resource.create_permission()],
            Command::Update { resource, .. } => vec![resource.update_permission()],
            Command::Delete { resource, .. } => vec![resource.delete_permission()],
            Command::Roles => vec![PermissionName::ViewRoles],
            Command::CreateRole { .. } => vec![PermissionName::CreateRole],
            Command::DeleteRole { .. } => vec![PermissionName::DeleteRole],
            Command::Perms { .. } => vec![PermissionName::ViewRoles, PermissionName::ViewPermissions],
            Command::Grant { .. } | Command::Revoke { .. } => {
                vec![PermissionName::ManageRolePermissions]
            }
            Command::Catalog => vec![PermissionName::ViewPermissions],
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// Listings
// =============================================================================

/// One listing per resource, so each keeps its own page position.
struct Listings {
    suppliers: ListingController<Supplier>,
    receivers: ListingController<Receiver>,
    products: ListingController<Product>,
    inventories: ListingController<Inventory>,
    inbound_orders: ListingController<InboundOrder>,
    outbound_orders: ListingController<OutboundOrder>,
    users: ListingController<User>,
}

impl Listings {
    fn new(dashboard: &Dashboard) -> ClientResult<Self> {
        Ok(Listings {
            suppliers: dashboard.listing()?,
            receivers: dashboard.listing()?,
            products: dashboard.listing()?,
            inventories: dashboard.listing()?,
            inbound_orders: dashboard.listing()?,
            outbound_orders: dashboard.listing()?,
            users: dashboard.listing()?,
        })
    }

    fn unmount(&self) {
        self.suppliers.unmount();
        self.receivers.unmount();
        self.products.unmount();
        self.inventories.unmount();
        self.inbound_orders.unmount();
        self.outbound_orders.unmount();
        self.users.unmount();
    }
}

/// Runs `$body` with `$listing` bound to the kind's controller and `$draft`
/// naming its create/update body type.
macro_rules! with_listing {
    ($listings:expr, $kind:expr, |$listing:ident, $draft:ident| $body:expr) => {
        match $kind {
            ResourceKind::Suppliers => {
                let $listing = &$listings.suppliers;
                type $draft = SupplierDraft;
                $body
            }
            ResourceKind::Receivers => {
                let $listing = &$listings.receivers;
                type $draft = ReceiverDraft;
                $body
            }
            ResourceKind::Products => {
                let $listing = &$listings.products;
                type $draft = ProductDraft;
                $body
            }
            ResourceKind::Inventories => {
                let $listing = &$listings.inventories;
                type $draft = InventoryDraft;
                $body
            }
            ResourceKind::InboundOrders => {
                let $listing = &$listings.inbound_orders;
                type $draft = InboundOrderDraft;
                $body
            }
            ResourceKind::OutboundOrders => {
                let $listing = &$listings.outbound_orders;
                type $draft = OutboundOrderDraft;
                $body
            }
            ResourceKind::Users => {
                let $listing = &$listings.users;
                type $draft = UserDraft;
                $body
            }
        }
    };
}

// =============================================================================
// Shell
// =============================================================================

pub struct Shell {
    dashboard: Dashboard,
    listings: Listings,
    current: Option<ResourceKind>,
}

enum Flow {
    Continue,
    Quit,
}

impl Shell {
    pub fn new(dashboard: Dashboard) -> anyhow::Result<Self> {
        let listings = Listings::new(&dashboard).context("creating listings")?;
        Ok(Shell {
            dashboard,
            listings,
            current: None,
        })
    }

    pub fn greet(&self, hints: &BootHints) {
        println!("Stockroom dashboard. Type `help` for commands.");
        if hints.dark_mode {
            println!("Theme: dark");
        }
        if let Some(user) = &hints.last_user {
            println!("Last signed in as {} <{}>", user.display_name(), user.email);
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{}> ", self.dashboard.session().phase());
            std::io::stdout().flush().context("writing prompt")?;

            let Some(line) = lines.next_line().await.context("reading input")? else {
                break;
            };
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let command = match Line::try_parse_from(words) {
                Ok(parsed) => parsed.command,
                Err(e) => {
                    println!("{}", e.render());
                    continue;
                }
            };
            if let Flow::Quit = self.dispatch(command).await {
                break;
            }
        }
        self.listings.unmount();
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Flow {
        let session = self.dashboard.session();
        if session.lock_if_idle() {
            println!("Locked after inactivity.");
        }

        match session.guard(command.access()) {
            RouteDecision::Allow => {}
            RouteDecision::RedirectToLogin => {
                println!("Please log in first.");
                return Flow::Continue;
            }
            RouteDecision::RedirectToLock => {
                println!("Session locked. Use `unlock <password>`.");
                return Flow::Continue;
            }
            RouteDecision::RedirectToHome => {
                println!("Already signed in.");
                return Flow::Continue;
            }
        }

        let required = command.required();
        if !required.is_empty() && !self.dashboard.gate().has_any(&required) {
            println!("You do not have access to this.");
            return Flow::Continue;
        }

        session.touch();
        debug!(?command, "Running command");
        match self.execute(command).await {
            Ok(flow) => flow,
            Err(e) => {
                if let Err(e) = self.dashboard.settle::<()>(Err(e)) {
                    match e {
                        ClientError::AuthExpired => println!("Session expired. Please log in again."),
                        other @ ClientError::Server { .. } if other.is_retryable() => {
                            println!("Error: {} Try again in a moment.", other.user_message())
                        }
                        other => println!("Error: {}", other.user_message()),
                    }
                }
                Flow::Continue
            }
        }
    }

    async fn execute(&mut self, command: Command) -> ClientResult<Flow> {
        let dashboard = &self.dashboard;
        match command {
            Command::Login { email, password } => {
                let session = dashboard.login(&email, &password).await?;
                println!(
                    "Welcome, {} ({}) at {}",
                    session.user.display_name(),
                    session.user.role,
                    session.business.name
                );
            }
            Command::Register {
                first_name,
                last_name,
                email,
                password,
                business,
            } => {
                let request = RegisterRequest {
                    first_name,
                    last_name,
                    email,
                    password,
                    business_name: business,
                    business_email: None,
                    business_phone: None,
                    business_address: None,
                };
                let session = dashboard.register(&request).await?;
                println!("Registered {} for {}", session.user.email, session.business.name);
            }
            Command::Lock => {
                dashboard.session().lock()?;
                println!("Locked.");
            }
            Command::Unlock { password } => {
                dashboard.unlock(&password).await?;
                println!("Unlocked.");
            }
            Command::Logout => {
                self.listings.unmount();
                dashboard.logout().await?;
                self.listings = Listings::new(dashboard)?;
                self.current = None;
                println!("Signed out.");
            }
            Command::Whoami => match dashboard.session().session() {
                Some(session) => {
                    println!("{} <{}>", session.user.display_name(), session.user.email);
                    println!("Role:     {}", session.user.role);
                    println!("Business: {}", session.business.name);
                    let granted: Vec<String> =
                        dashboard.gate().permissions().iter().map(|p| p.to_string()).collect();
                    println!("Granted:  {}", granted.join(", "));
                }
                None => println!("Not signed in."),
            },
            Command::Theme => {
                let dark = dashboard.session().toggle_dark_mode()?;
                println!("Theme: {}", if dark { "dark" } else { "light" });
            }
            Command::List {
                resource,
                page,
                size,
            } => {
                self.current = Some(resource);
                with_listing!(self.listings, resource, |listing, _Draft| {
                    let mut fetched = false;
                    if let Some(size) = size.filter(|s| *s != listing.page_state().page_size()) {
                        listing.set_page_size(size).await?;
                        fetched = true;
                    }
                    let current = listing.page_state().page();
                    let target = page.map_or(current, |p| p.saturating_sub(1));
                    if target != current {
                        listing.set_page(target).await?;
                    } else if !fetched {
                        listing.refresh().await?;
                    }
                    self.print_page(resource, listing);
                });
            }
            Command::Next | Command::Prev => {
                let Some(resource) = self.current else {
                    println!("List a resource first.");
                    return Ok(Flow::Continue);
                };
                let forward = matches!(command, Command::Next);
                with_listing!(self.listings, resource, |listing, _Draft| {
                    let moved = if forward {
                        listing.next_page().await?
                    } else {
                        listing.prev_page().await?
                    };
                    if moved {
                        self.print_page(resource, listing);
                    } else {
                        println!("No more pages.");
                    }
                });
            }
            Command::Search { resource, query } => {
                let query = query.join(" ");
                with_listing!(self.listings, resource, |listing, _Draft| {
                    match listing.search(&query).await? {
                        Some(rows) if rows.is_empty() => println!("No matches."),
                        Some(rows) => rows.iter().for_each(print_row),
                        None => println!("Search cleared."),
                    }
                });
            }
            Command::Show { resource, id } => {
                with_listing!(self.listings, resource, |listing, _Draft| {
                    let record = listing.show(&id).await?;
                    println!("{}", pretty(&record)?);
                });
            }
            Command::Create { resource, json } => {
                with_listing!(self.listings, resource, |listing, Draft| {
                    let draft: Draft = parse_body(&json)?;
                    let created = listing.create(&draft).await?;
                    println!("{} {} created.", resource.label(), created.id());
                });
            }
            Command::Update { resource, id, json } => {
                with_listing!(self.listings, resource, |listing, Draft| {
                    let draft: Draft = parse_body(&json)?;
                    let updated = listing.update(&id, &draft).await?;
                    println!("{} {} updated.", resource.label(), updated.id());
                });
            }
            Command::Delete { resource, id } => {
                with_listing!(self.listings, resource, |listing, _Draft| {
                    let message = listing.delete(&id).await?;
                    println!("{}", message);
                    if self.current == Some(resource) {
                        self.print_page(resource, listing);
                    }
                });
            }
            Command::Roles => {
                for role in dashboard.roles().load_roles().await? {
                    let reserved = if role.is_reserved() { " (reserved)" } else { "" };
                    println!("{}{}", role.name, reserved);
                }
            }
            Command::CreateRole { name, description } => {
                let role = dashboard
                    .roles()
                    .create_role(&CreateRoleRequest { name, description })
                    .await?;
                println!("Role {} created.", role.name);
            }
            Command::DeleteRole { name } => {
                println!("{}", dashboard.roles().delete_role(&name).await?);
            }
            Command::Perms { role } => {
                let set = dashboard.roles().permission_set(&role).await?;
                if set.is_empty() {
                    println!("{} holds no permissions.", role);
                }
                for permission in set.iter() {
                    println!("{}", permission);
                }
            }
            Command::Grant { role, permission } => {
                println!("{}", dashboard.roles().grant(&role, permission).await?);
            }
            Command::Revoke { role, permission } => {
                println!("{}", dashboard.roles().revoke(&role, permission).await?);
            }
            Command::Catalog => {
                for permission in dashboard.roles().load_catalog().await? {
                    let description = permission.description.as_deref().unwrap_or("");
                    println!("{:<28} {}", permission.name, description);
                }
            }
            Command::Refresh => {
                let set = dashboard.refresh_permissions().await?;
                println!("{} permissions granted.", set.len());
            }
            Command::Help => print_help(),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn print_page<T: stockroom_client::StoreSlot>(&self, kind: ResourceKind, listing: &ListingController<T>) {
        match self.dashboard.store().listing::<T>() {
            Some(page) => print_collection(kind, &page, listing.page_state()),
            None => println!("Nothing loaded."),
        }
        if let Some(error) = listing.fetch_state().error {
            println!("Error: {}", error);
        }
    }
}

fn print_collection<T: Resource>(kind: ResourceKind, page: &PaginatedCollection<T>, state: PageState) {
    let total = page.total_count();
    match state.row_range(page.len(), total) {
        Some((first, last)) => {
            page.items().iter().for_each(print_row);
            println!(
                "Rows {}-{} of {}, page {} of {}",
                first,
                last,
                total,
                state.page() + 1,
                state.page_count(total)
            );
        }
        None => println!("No {} found.", kind.path().replace('-', " ")),
    }
}

fn print_row<T: Resource>(row: &T) {
    let body = serde_json::to_string(row).unwrap_or_default();
    println!("{:<12} {}", row.id(), body);
}

/// Joins the whitespace-split words back into one JSON document.
fn parse_body<D: DeserializeOwned>(words: &[String]) -> ClientResult<D> {
    serde_json::from_str(&words.join(" ")).map_err(|e| {
        ValidationError::InvalidFormat {
            field: "body".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn pretty<T: Resource>(record: &T) -> ClientResult<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

fn print_help() {
    println!(
        "\
login <email> <password>        register --first-name .. --last-name .. --email .. --password .. --business ..
lock | unlock <password>        logout | whoami | theme | refresh
list <resource> [page] [size]   next | prev
search <resource> <query>       show <resource> <id>
create <resource> <json>        update <resource> <id> <json>
delete <resource> <id>
roles | create-role <name> | delete-role <name>
perms <role> | grant <role> <permission> | revoke <role> <permission> | catalog
quit

resources: {}",
        ResourceKind::ALL.map(|k| k.path()).join(", ")
    );
}
