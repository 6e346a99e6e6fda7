use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::{Arc, Mutex};

use arisan_core::auth::{self, Principal, Trust};
use arisan_core::groups::NewGroup;
use arisan_core::members::{MemberPatch, NewMember};
use arisan_core::expenses::NewExpense;
use arisan_core::watch::CollectionWatcher;
use arisan_core::{
    announcements, expenses, groups, lottery, members, payments, reports, settings, AppConfig,
    Category, CategoryLabels, Channel, CommunicationPreferences, MonthlySettings, Store,
};
use chrono::{Local, NaiveDate, Utc};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SignInRequest {
    /// Stable user id from the identity provider
    uid: String,
    /// Email address. Claimed emails never grant write access; only the operator configured at startup, or an admin signing someone in, can.
    email: Option<String>,
    /// Display name
    display_name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct RegisterMemberRequest {
    /// Full name, unique across members (case-insensitive)
    name: String,
    /// Phone number, e.g. "0812-3456-7890"
    phone: Option<String>,
    /// Email address
    email: Option<String>,
    /// Avatar image URL
    avatar_url: Option<String>,
    /// Preferred reminder channel: "whatsapp", "sms", "email" or "call". Default: whatsapp.
    channel: Option<Channel>,
    /// Preferred time of day for reminders, "HH:MM"
    preferred_time: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct UpdateMemberRequest {
    /// ID of the member to update (e.g. "member-3")
    member_id: String,
    /// New name
    name: Option<String>,
    /// New phone number. Empty string clears it.
    phone: Option<String>,
    /// New email address. Empty string clears it.
    email: Option<String>,
    /// New avatar image URL. Empty string clears it.
    avatar_url: Option<String>,
    /// New preferred channel
    channel: Option<Channel>,
    /// New preferred time, "HH:MM". Empty string clears it.
    preferred_time: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct MemberIdRequest {
    /// ID of the member (e.g. "member-3")
    member_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CreateGroupRequest {
    /// Group name, e.g. "Arisan Utama"
    name: String,
    /// Monthly due per member in rupiah, e.g. 100000
    contribution_amount: i64,
    /// Whether this group's cash dues fund the cash balance. The first group is primary by default.
    primary: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GroupIdRequest {
    /// ID of the group (e.g. "group-1")
    group_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GroupMemberRequest {
    /// ID of the group
    group_id: String,
    /// ID of the member
    member_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct MonthRequest {
    /// Month as "YYYY-MM"
    month: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SaveSettingsRequest {
    /// Month as "YYYY-MM"
    month: String,
    /// Per-member dues for the month in rupiah. Extra items go in `others` with a description; leave `id` empty for new items.
    settings: MonthlySettings,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SaveLabelsRequest {
    /// Display labels for the contribution categories. None may be empty.
    labels: CategoryLabels,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct OpenCycleRequest {
    /// ID of the group
    group_id: String,
    /// Due date for this cycle, "YYYY-MM-DD"
    due_date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetPaymentRequest {
    /// ID of the payment (e.g. "payment-12")
    payment_id: String,
    /// true to mark every category paid, false to mark every category unpaid
    paid: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetContributionRequest {
    /// ID of the payment
    payment_id: String,
    /// Category key: "main", "cash", "sick", "bereavement", or "other:<id>"
    category: String,
    /// Paid or not
    paid: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct RecordExpenseRequest {
    /// What the money was spent on
    description: String,
    /// Expense category. Use "Talangan Kas" for cash advances, which reduce the cash balance.
    category: String,
    /// Amount in rupiah, greater than zero
    amount: i64,
    /// Date of the expense, "YYYY-MM-DD". Default: today.
    date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ExpenseIdRequest {
    /// ID of the expense (e.g. "expense-4")
    expense_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CreateAnnouncementRequest {
    /// Title, required
    title: String,
    /// Body text, required
    content: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct UpdateAnnouncementRequest {
    /// ID of the announcement
    announcement_id: String,
    /// New title
    title: String,
    /// New body text
    content: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AnnouncementIdRequest {
    /// ID of the announcement
    announcement_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SuggestRemindersRequest {
    /// ID of the member to plan reminders for
    member_id: String,
    /// Due date of the current cycle, "YYYY-MM-DD". Must not be in the past.
    due_date: String,
}

// --- Server ---

#[derive(Clone)]
pub struct ArisanServer {
    store: Store,
    config: AppConfig,
    principal: Arc<Mutex<Principal>>,
    changed: Arc<Mutex<BTreeSet<&'static str>>>,
    tool_router: ToolRouter<Self>,
}

fn text(s: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(s.into())]))
}

fn fail(e: impl Display) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
}

fn json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(s) => text(s),
        Err(e) => fail(format!("Gagal menyusun jawaban: {}", e)),
    }
}

/// Serialize an operation's result, or report its error as tool output.
fn respond<T: Serialize>(res: arisan_core::Result<T>) -> Result<CallToolResult, McpError> {
    match res {
        Ok(v) => json(&v),
        Err(e) => fail(e),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Tanggal '{}' harus berformat YYYY-MM-DD", s))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

macro_rules! require_admin {
    ($self:ident) => {
        if let Err(e) = $self.require_admin() {
            return fail(e);
        }
    };
}

#[tool_router]
impl ArisanServer {
    pub fn new(store: Store, config: AppConfig, principal: Principal) -> Self {
        Self {
            store,
            config,
            principal: Arc::new(Mutex::new(principal)),
            changed: Arc::new(Mutex::new(BTreeSet::new())),
            tool_router: Self::tool_router(),
        }
    }

    /// Start recording collection changes for `recent_changes`.
    pub fn watch(&self) -> arisan_core::Result<CollectionWatcher> {
        let changed = self.changed.clone();
        arisan_core::watch::watch(&self.store, move |collection| {
            if let Ok(mut set) = changed.lock() {
                set.insert(collection.name());
            }
        })
    }

    fn current_principal(&self) -> Principal {
        self.principal
            .lock()
            .map(|p| p.clone())
            .unwrap_or(Principal::Guest)
    }

    fn require_admin(&self) -> arisan_core::Result<()> {
        self.current_principal().require_admin()
    }

    // --- Session ---

    #[tool(description = "Show who the server is acting as and whether writes are allowed")]
    fn whoami(&self) -> Result<CallToolResult, McpError> {
        let text_out = match self.current_principal() {
            Principal::Admin(uid) => format!("Admin '{}' (baca dan tulis)", uid),
            Principal::Member(uid) => format!("Anggota '{}' (hanya baca)", uid),
            Principal::Guest => "Tamu (hanya baca)".to_string(),
        };
        text(text_out)
    }

    #[tool(
        description = "Sign in as a user; subsequent tool calls act as this user. Creates the user profile if it is new. Only an admin session can sign in someone with write access; otherwise the new session is read-only."
    )]
    fn sign_in(
        &self,
        Parameters(req): Parameters<SignInRequest>,
    ) -> Result<CallToolResult, McpError> {
        // Nothing here authenticates the caller: only an admin session vouches.
        let trust = if self.current_principal().is_admin() {
            Trust::Verified
        } else {
            Trust::Claimed
        };
        match auth::sign_in(
            &self.store,
            &self.config,
            &req.uid,
            req.email,
            req.display_name,
            trust,
        ) {
            Ok(profile) => {
                let principal = auth::principal_of(&profile, trust);
                tracing::info!(?principal, "session signed in");
                if let Ok(mut p) = self.principal.lock() {
                    *p = principal;
                }
                json(&profile)
            }
            Err(e) => fail(e),
        }
    }

    #[tool(description = "Get the arisan bookkeeping rules and the recommended workflow")]
    fn get_rules(&self) -> Result<CallToolResult, McpError> {
        text(arisan_core::rules::RULES)
    }

    #[tool(
        description = "List collections (members, groups, payments, ...) that changed on disk since the last call. Use it to notice edits made by another client before re-reading."
    )]
    fn recent_changes(&self) -> Result<CallToolResult, McpError> {
        let drained: Vec<&str> = match self.changed.lock() {
            Ok(mut set) => std::mem::take(&mut *set).into_iter().collect(),
            Err(_) => Vec::new(),
        };
        if drained.is_empty() {
            text("Tidak ada perubahan sejak terakhir dilihat.")
        } else {
            text(format!("Berubah: {}", drained.join(", ")))
        }
    }

    // --- Members ---

    #[tool(description = "List all registered members")]
    fn list_members(&self) -> Result<CallToolResult, McpError> {
        respond(members::list_members(&self.store))
    }

    #[tool(description = "Register a new member. Returns the created member with its ID.")]
    fn register_member(
        &self,
        Parameters(req): Parameters<RegisterMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        let new = NewMember {
            name: req.name,
            phone: req.phone,
            email: req.email,
            avatar_url: req.avatar_url,
            communication: CommunicationPreferences {
                channel: req.channel.unwrap_or_default(),
                preferred_time: req.preferred_time,
            },
        };
        respond(members::register_member(&self.store, new, today()))
    }

    #[tool(description = "Update fields of an existing member. Omitted fields are left unchanged.")]
    fn update_member(
        &self,
        Parameters(req): Parameters<UpdateMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        let communication = if req.channel.is_some() || req.preferred_time.is_some() {
            let current = match members::get_member(&self.store, &req.member_id) {
                Ok(m) => m.communication,
                Err(e) => return fail(e),
            };
            Some(CommunicationPreferences {
                channel: req.channel.unwrap_or(current.channel),
                preferred_time: req.preferred_time.or(current.preferred_time),
            })
        } else {
            None
        };
        let patch = MemberPatch {
            name: req.name,
            phone: req.phone,
            email: req.email,
            avatar_url: req.avatar_url,
            communication,
        };
        respond(members::update_member(&self.store, &req.member_id, patch))
    }

    #[tool(
        description = "Remove a member. They are dropped from every group roster; winner history and past payments are kept."
    )]
    fn remove_member(
        &self,
        Parameters(req): Parameters<MemberIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        match members::remove_member(&self.store, &req.member_id) {
            Ok(m) => text(format!("Anggota '{}' ({}) dihapus", m.name, m.id)),
            Err(e) => fail(e),
        }
    }

    // --- Groups ---

    #[tool(description = "List all arisan groups with their rosters, current winner and winner history")]
    fn list_groups(&self) -> Result<CallToolResult, McpError> {
        respond(groups::list_groups(&self.store))
    }

    #[tool(description = "Create an arisan group")]
    fn create_group(
        &self,
        Parameters(req): Parameters<CreateGroupRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(groups::create_group(
            &self.store,
            NewGroup {
                name: req.name,
                contribution_amount: req.contribution_amount,
                primary: req.primary.unwrap_or(false),
            },
        ))
    }

    #[tool(description = "Make a group the primary group whose cash dues fund the cash balance")]
    fn set_primary_group(
        &self,
        Parameters(req): Parameters<GroupIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(groups::set_primary_group(&self.store, &req.group_id))
    }

    #[tool(description = "Add a registered member to a group's roster")]
    fn add_group_member(
        &self,
        Parameters(req): Parameters<GroupMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(groups::add_group_member(&self.store, &req.group_id, &req.member_id))
    }

    #[tool(description = "Remove a member from a group's roster")]
    fn remove_group_member(
        &self,
        Parameters(req): Parameters<GroupMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(groups::remove_group_member(&self.store, &req.group_id, &req.member_id))
    }

    // --- Contribution settings ---

    #[tool(
        description = "Get the dues for a month. If the month has none, the previous month's settings are returned (source.kind = \"previousMonth\"); with neither, zeros (source.kind = \"default\")."
    )]
    fn get_monthly_settings(
        &self,
        Parameters(req): Parameters<MonthRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(settings::monthly_settings(&self.store, &req.month))
    }

    #[tool(description = "Save the dues for a month. Amounts are rupiah and must not be negative.")]
    fn save_monthly_settings(
        &self,
        Parameters(req): Parameters<SaveSettingsRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(settings::save_monthly_settings(&self.store, &req.month, req.settings))
    }

    #[tool(description = "Get the display labels of the contribution categories")]
    fn get_labels(&self) -> Result<CallToolResult, McpError> {
        respond(settings::labels(&self.store))
    }

    #[tool(description = "Rename the contribution categories")]
    fn save_labels(
        &self,
        Parameters(req): Parameters<SaveLabelsRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(settings::save_labels(&self.store, req.labels))
    }

    // --- Payments ---

    #[tool(
        description = "Open a payment cycle: create one payment per group member for the due date's month. Members who already have a payment that month are skipped."
    )]
    fn open_cycle(
        &self,
        Parameters(req): Parameters<OpenCycleRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        let due = match parse_date(&req.due_date) {
            Ok(d) => d,
            Err(e) => return fail(e),
        };
        match payments::open_cycle(&self.store, &req.group_id, due) {
            Ok(created) if created.is_empty() => {
                text("Semua anggota sudah punya pembayaran untuk bulan ini.")
            }
            Ok(created) => json(&created),
            Err(e) => fail(e),
        }
    }

    #[tool(
        description = "Payment checklist for a group: one row per payment with member name, amount, amount paid and status (Paid, Unpaid, Late)."
    )]
    fn payment_overview(
        &self,
        Parameters(req): Parameters<GroupIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(payments::payment_overview(&self.store, &req.group_id, today()))
    }

    #[tool(description = "Mark a whole payment paid or unpaid")]
    fn set_payment(
        &self,
        Parameters(req): Parameters<SetPaymentRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(payments::set_payment_paid(&self.store, &req.payment_id, req.paid, Utc::now()))
    }

    #[tool(description = "Mark one contribution category of a payment paid or unpaid")]
    fn set_contribution(
        &self,
        Parameters(req): Parameters<SetContributionRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        let category: Category = match req.category.parse() {
            Ok(c) => c,
            Err(e) => return fail(e),
        };
        respond(payments::set_contribution_paid(
            &self.store,
            &req.payment_id,
            &category,
            req.paid,
            Utc::now(),
        ))
    }

    #[tool(
        description = "Payment history of one member across all groups, oldest first, with status and paid date"
    )]
    fn member_history(
        &self,
        Parameters(req): Parameters<MemberIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = members::get_member(&self.store, &req.member_id) {
            return fail(e);
        }
        respond(payments::member_payment_history(&self.store, &req.member_id, today()))
    }

    // --- Expenses ---

    #[tool(description = "List expenses, newest first")]
    fn list_expenses(&self) -> Result<CallToolResult, McpError> {
        respond(expenses::list_expenses(&self.store))
    }

    #[tool(description = "Record an expense")]
    fn record_expense(
        &self,
        Parameters(req): Parameters<RecordExpenseRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        let date = match req.date.as_deref().map(parse_date).transpose() {
            Ok(d) => d.unwrap_or_else(today),
            Err(e) => return fail(e),
        };
        respond(expenses::record_expense(
            &self.store,
            NewExpense {
                description: req.description,
                category: req.category,
                amount: req.amount,
                date,
            },
        ))
    }

    #[tool(description = "Delete an expense by ID")]
    fn delete_expense(
        &self,
        Parameters(req): Parameters<ExpenseIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        match expenses::delete_expense(&self.store, &req.expense_id) {
            Ok(e) => text(format!("Pengeluaran '{}' dihapus", e.id)),
            Err(e) => fail(e),
        }
    }

    // --- Announcements ---

    #[tool(
        description = "List announcements, most recently updated first, followed by the one-line ticker text"
    )]
    fn list_announcements(&self) -> Result<CallToolResult, McpError> {
        match announcements::list_announcements(&self.store) {
            Ok(list) => {
                let marquee = announcements::marquee_text(&list);
                json(&serde_json::json!({ "announcements": list, "marquee": marquee }))
            }
            Err(e) => fail(e),
        }
    }

    #[tool(description = "Post a new announcement")]
    fn create_announcement(
        &self,
        Parameters(req): Parameters<CreateAnnouncementRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(announcements::create_announcement(
            &self.store,
            &req.title,
            &req.content,
            Utc::now(),
        ))
    }

    #[tool(description = "Edit an announcement")]
    fn update_announcement(
        &self,
        Parameters(req): Parameters<UpdateAnnouncementRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(announcements::update_announcement(
            &self.store,
            &req.announcement_id,
            &req.title,
            &req.content,
            Utc::now(),
        ))
    }

    #[tool(description = "Delete an announcement")]
    fn delete_announcement(
        &self,
        Parameters(req): Parameters<AnnouncementIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        match announcements::delete_announcement(&self.store, &req.announcement_id) {
            Ok(()) => text(format!("Pengumuman '{}' dihapus", req.announcement_id)),
            Err(e) => fail(e),
        }
    }

    // --- Lottery ---

    #[tool(
        description = "Set the winner of the current draw by hand. The member must be in the group and must not have won before; they are appended to the winner history."
    )]
    fn set_winner(
        &self,
        Parameters(req): Parameters<GroupMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(lottery::set_winner(&self.store, &req.group_id, &req.member_id, Utc::now()))
    }

    #[tool(description = "Clear the current winner of a group. Winner history is not touched.")]
    fn clear_winner(
        &self,
        Parameters(req): Parameters<GroupIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        respond(lottery::clear_winner(&self.store, &req.group_id))
    }

    #[tool(
        description = "Draw a winner at random from the group members who have not won yet, and record it"
    )]
    fn draw_winner(
        &self,
        Parameters(req): Parameters<GroupIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        require_admin!(self);
        let mut rng = rand::thread_rng();
        let group = match lottery::draw_winner(&self.store, &req.group_id, &mut rng, Utc::now()) {
            Ok(g) => g,
            Err(e) => return fail(e),
        };
        let winner_id = group.current_winner_id.clone().unwrap_or_default();
        let name = members::get_member(&self.store, &winner_id)
            .map(|m| m.name)
            .unwrap_or(winner_id);
        let remaining = lottery::eligible_members(&group).len();
        text(format!(
            "Pemenang {}: {}. {} anggota belum menarik.",
            group.name, name, remaining
        ))
    }

    #[tool(description = "Winner history of every group, with member names and draw dates")]
    fn winner_history(&self) -> Result<CallToolResult, McpError> {
        respond(reports::winner_history(&self.store))
    }

    // --- Reports ---

    #[tool(
        description = "Current cash balance: paid cash dues of the primary group minus \"Talangan Kas\" expenses"
    )]
    fn financial_summary(&self) -> Result<CallToolResult, McpError> {
        match reports::cash_balance(&self.store) {
            Ok(balance) => json(&serde_json::json!({
                "cashBalance": balance,
                "formatted": arisan_core::format_idr(balance),
            })),
            Err(e) => fail(e),
        }
    }

    #[tool(
        description = "Monthly report: collected and outstanding totals per category for payments due in the month, expenses dated in the month, and net"
    )]
    fn monthly_report(
        &self,
        Parameters(req): Parameters<MonthRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(reports::monthly_report(&self.store, &req.month))
    }

    // --- Reminders ---

    #[tool(
        description = "Ask the configured AI for a reminder schedule (dates, times, channel, message) for one member's upcoming due, with its reasoning. Present the result as-is."
    )]
    async fn suggest_reminders(
        &self,
        Parameters(req): Parameters<SuggestRemindersRequest>,
    ) -> Result<CallToolResult, McpError> {
        let due = match parse_date(&req.due_date) {
            Ok(d) => d,
            Err(e) => return fail(e),
        };
        let request =
            match arisan_suggest::ReminderRequest::from_store(&self.store, &req.member_id, due, today()) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };
        match arisan_suggest::suggest_reminders(&request, &self.config.ai).await {
            Ok(plan) => json(&plan),
            Err(e) => fail(e),
        }
    }
}

#[tool_handler]
impl ServerHandler for ArisanServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            "{}\n\n## Arisan Rules\n{}",
            INSTRUCTIONS,
            arisan_core::rules::RULES
        );
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"arisan manages a family rotating-savings group (arisan). Data is stored as JSON documents in the arisan data directory ($ARISAN_HOME or ~/.arisan).

## Entities
- **Member**: a family member. IDs look like "member-N".
- **Group**: an arisan group with a roster, a monthly due, a current winner and an append-only winner history. IDs "group-N". Exactly one group is primary.
- **Payment**: one member's due for one month in one group, split into categories that are ticked paid independently. IDs "payment-N".
- **Expense**: money spent from the pot. IDs "expense-N".
- **Announcement**: a notice for the family. IDs "announcement-N".

## Categories
"main", "cash", "sick", "bereavement", and "other:<id>" for extra items defined in a month's settings.

## Access
Reads are open. Writes need an admin: the operator configured at startup, or someone an admin session signed in. Use `whoami` to check. `sign_in` by a non-admin session gives a read-only session."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let store = Store::open_default()?;
    let config = arisan_core::config::read_config(store.root());
    let principal = auth::principal_for(&store, &config)?;
    tracing::info!(data_dir = %store.root().display(), ?principal, "starting arisan MCP server");

    let server = ArisanServer::new(store, config, principal);
    // Keep the watcher alive for the server's lifetime.
    let _watcher = server
        .watch()
        .inspect_err(|e| tracing::warn!(error = %e, "collection watcher unavailable"))
        .ok();

    let service = server
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
