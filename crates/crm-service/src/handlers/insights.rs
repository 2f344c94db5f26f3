//! Plan-gated views over a tenant's data: pipeline, analytics, search, export.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crm_core::{
    AccountId, BillingPlan, Company, Contact, Deal, DealStage, Feature, Task, TaskStatus,
    TenantRecord, TenantScope, User,
};
use crm_store::{Store, TenantRepository};

use crate::context::TenantContext;
use crate::error::ApiError;
use crate::state::AppState;

fn all<T: TenantRecord>(store: &dyn Store, account: AccountId) -> Result<Vec<T>, ApiError> {
    Ok(TenantRepository::<T>::new(store).list(TenantScope::Account(account))?)
}

/// Deals in one pipeline stage.
#[derive(Debug, Serialize)]
pub struct PipelineStage {
    /// Stage.
    pub stage: DealStage,
    /// Number of deals.
    pub count: usize,
    /// Sum of deal values.
    pub total_value_cents: i64,
    /// The deals.
    pub deals: Vec<Deal>,
}

/// Deals grouped by stage, in pipeline order.
#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    /// One entry per stage, empty stages included.
    pub stages: Vec<PipelineStage>,
    /// Value of all deals not yet won or lost.
    pub open_value_cents: i64,
}

/// Sum of deal values, saturating at `i64::MAX`.
fn total_value<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> i64 {
    deals
        .into_iter()
        .fold(0_i64, |total, deal| total.saturating_add(deal.value_cents))
}

/// `GET /deals/pipeline`.
pub async fn pipeline(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
) -> Result<Json<PipelineResponse>, ApiError> {
    state.gate.require_feature(&ctx, Feature::PipelineView)?;

    let deals: Vec<Deal> = all(state.store.as_ref(), ctx.account_id())?;
    let open_value_cents = total_value(deals.iter().filter(|deal| !deal.stage.is_closed()));

    let stages = DealStage::ALL
        .into_iter()
        .map(|stage| {
            let deals: Vec<Deal> = deals
                .iter()
                .filter(|deal| deal.stage == stage)
                .cloned()
                .collect();
            PipelineStage {
                stage,
                count: deals.len(),
                total_value_cents: total_value(&deals),
                deals,
            }
        })
        .collect();

    Ok(Json(PipelineResponse {
        stages,
        open_value_cents,
    }))
}

/// Headline numbers for the analytics dashboard.
#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    /// Users.
    pub users: u64,
    /// Companies.
    pub companies: u64,
    /// Contacts.
    pub contacts: u64,
    /// Deals.
    pub deals: usize,
    /// Deals not yet won or lost.
    pub open_deals: usize,
    /// Won deals.
    pub won_deals: usize,
    /// Lost deals.
    pub lost_deals: usize,
    /// Value of open deals.
    pub pipeline_value_cents: i64,
    /// Value of won deals.
    pub won_value_cents: i64,
    /// Won share of closed deals, in whole percent. `null` with no closed deals.
    pub win_rate_percent: Option<usize>,
    /// Tasks not done.
    pub open_tasks: usize,
    /// Open tasks past their due date.
    pub overdue_tasks: usize,
}

/// `GET /analytics/summary`.
pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    state.gate.require_feature(&ctx, Feature::AnalyticsDashboard)?;

    let store = state.store.as_ref();
    let account = ctx.account_id();
    let deals: Vec<Deal> = all(store, account)?;
    let tasks: Vec<Task> = all(store, account)?;
    let now = Utc::now();

    let by_stage = |stage: DealStage| deals.iter().filter(move |deal| deal.stage == stage);
    let won_deals = by_stage(DealStage::Won).count();
    let lost_deals = by_stage(DealStage::Lost).count();
    let closed = won_deals + lost_deals;

    Ok(Json(AnalyticsSummary {
        users: TenantRepository::<User>::new(store).count(account)?,
        companies: TenantRepository::<Company>::new(store).count(account)?,
        contacts: TenantRepository::<Contact>::new(store).count(account)?,
        deals: deals.len(),
        open_deals: deals.len() - closed,
        won_deals,
        lost_deals,
        pipeline_value_cents: total_value(deals.iter().filter(|deal| !deal.stage.is_closed())),
        won_value_cents: total_value(by_stage(DealStage::Won)),
        win_rate_percent: (closed > 0).then(|| won_deals * 100 / closed),
        open_tasks: tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Done)
            .count(),
        overdue_tasks: tasks.iter().filter(|task| task.is_overdue(now)).count(),
    }))
}

/// Search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive substring.
    #[serde(default)]
    pub q: String,
}

/// Matches per entity.
#[derive(Debug, Serialize)]
pub struct SearchResults {
    /// Companies whose name matches.
    pub companies: Vec<Company>,
    /// Contacts whose name or email matches.
    pub contacts: Vec<Contact>,
    /// Deals whose title matches.
    pub deals: Vec<Deal>,
    /// Tasks whose title matches.
    pub tasks: Vec<Task>,
}

/// `GET /search?q=`.
pub async fn search(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ApiError> {
    state.gate.require_feature(&ctx, Feature::GlobalSearch)?;

    let needle = query.q.trim().to_lowercase();
    if needle.is_empty() {
        return Err(ApiError::validation("query parameter q must not be empty"));
    }
    let hit = |text: &str| text.to_lowercase().contains(&needle);

    let store = state.store.as_ref();
    let account = ctx.account_id();
    let mut companies: Vec<Company> = all(store, account)?;
    companies.retain(|company| hit(&company.name));
    let mut contacts: Vec<Contact> = all(store, account)?;
    contacts.retain(|contact| {
        hit(&contact.full_name()) || contact.email.as_deref().is_some_and(&hit)
    });
    let mut deals: Vec<Deal> = all(store, account)?;
    deals.retain(|deal| hit(&deal.title));
    let mut tasks: Vec<Task> = all(store, account)?;
    tasks.retain(|task| hit(&task.title));

    Ok(Json(SearchResults {
        companies,
        contacts,
        deals,
        tasks,
    }))
}

const CONTACT_CSV_HEADER: &str = "id,first_name,last_name,email,phone,position,company_id";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn contacts_csv(contacts: &[Contact]) -> String {
    let mut out = String::from(CONTACT_CSV_HEADER);
    out.push('\n');
    for contact in contacts {
        let row = [
            contact.id.to_string(),
            csv_field(&contact.first_name),
            csv_field(&contact.last_name),
            csv_field(contact.email.as_deref().unwrap_or_default()),
            csv_field(contact.phone.as_deref().unwrap_or_default()),
            csv_field(contact.position.as_deref().unwrap_or_default()),
            contact
                .company_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// `GET /contacts/export`: all contacts as CSV. Requires PRO or above.
pub async fn export_contacts(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    state.gate.require_min_plan(&ctx, BillingPlan::Pro)?;

    let contacts: Vec<Contact> = all(state.store.as_ref(), ctx.account_id())?;
    tracing::info!(
        account_id = %ctx.account_id(),
        user_id = %ctx.principal.id,
        rows = contacts.len(),
        "Contacts exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"contacts.csv\"",
            ),
        ],
        contacts_csv(&contacts),
    ))
}
