use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use treadify_db::models::{NewFeature, NewProduct, ProductRow};
use treadify_types::api::{
    AddFeatureRequest, AddFeatureResponse, CreateProductRequest, CreateProductResponse,
    DeadlineRequest, DeadlineResponse, FeatureReport, GoalResponse, MemberResponse,
    ProductReport, ProductStatusResponse,
};
use treadify_types::{Permission, ProductStatus, Role, Scope};

use crate::convert::{self, parse_role};
use crate::error::{ApiError, PendingJson};
use crate::github::parse_repo_url;
use crate::session::CurrentUser;
use crate::state::AppState;

const DEFAULT_BRANCH: &str = "main";

fn product_status(row: &ProductRow) -> ProductStatus {
    row.status.parse().unwrap_or(ProductStatus::Active)
}

fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Load the product in the caller's session scope.
async fn scoped_product(state: &AppState, current: &CurrentUser) -> Result<ProductRow, ApiError> {
    let product_id = current.product_id()?.to_string();
    state
        .db(move |db| db.get_product(&product_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

/// The scoped product, which must belong to the calling PM.
async fn owned_product(state: &AppState, current: &CurrentUser) -> Result<ProductRow, ApiError> {
    let product = scoped_product(state, current).await?;
    if product.pm_id != current.user.user_id {
        return Err(ApiError::forbidden("Not the owner of this product"));
    }
    Ok(product)
}

/// POST /productchannel
pub async fn create_product_channel(
    State(state): State<AppState>,
    mut current: CurrentUser,
    body: PendingJson<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .authorize(&current.user, Permission::CreateProductChannel)
        .await?;
    let req = body.parse()?;

    required(&req.name, "name")?;
    let repo = parse_repo_url(&req.repo_url)
        .ok_or_else(|| ApiError::validation("Invalid GitHub URL"))?;

    let product_id = Uuid::new_v4().to_string();
    let channel_id = Uuid::new_v4().to_string();

    let (pid, cid, pm_id) = (
        product_id.clone(),
        channel_id.clone(),
        current.user.user_id.clone(),
    );
    state
        .db(move |db| {
            db.create_product(&NewProduct {
                id: &pid,
                channel_id: &cid,
                pm_id: &pm_id,
                name: req.name.trim(),
                description: req.description.as_deref(),
                deadline: req.deadline,
                repo_owner: &repo.owner,
                repo_name: &repo.name,
                repo_url: &repo.url,
                default_branch: req.default_branch.as_deref().unwrap_or(DEFAULT_BRANCH),
            })
        })
        .await?;

    current
        .rescope(Scope {
            product_id: Some(product_id.clone()),
            feature_id: None,
            channel_id: Some(channel_id.clone()),
        })
        .await?;

    info!("Product {} created by {}", product_id, current.user.username);
    Ok((
        StatusCode::CREATED,
        Json(CreateProductResponse {
            product_id,
            channel_id,
        }),
    ))
}

/// POST /productchannel/features
///
/// The product comes from the session, never from the body.
pub async fn add_feature(
    State(state): State<AppState>,
    current: CurrentUser,
    body: PendingJson<AddFeatureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.authorize(&current.user, Permission::AddFeature).await?;
    let req = body.parse()?;
    required(&req.name, "name")?;

    let product = owned_product(&state, &current).await?;
    if product_status(&product) == ProductStatus::Deprecated {
        return Err(ApiError::validation("Product is deprecated"));
    }

    let tech_lead_id = match req.tech_lead.as_deref() {
        None => None,
        Some(name) => {
            let name = name.to_string();
            let lead = state
                .db(move |db| db.get_user_by_username(&name))
                .await?
                .ok_or_else(|| ApiError::not_found("Technical Lead not found"))?;
            if parse_role(lead.role.as_deref()) != Some(Role::TechnicalLead) {
                return Err(ApiError::validation("User is not a Technical Lead"));
            }
            Some(lead.id)
        }
    };

    let feature_id = Uuid::new_v4().to_string();
    let channel_id = Uuid::new_v4().to_string();

    let (fid, cid, created_by) = (
        feature_id.clone(),
        channel_id.clone(),
        current.user.user_id.clone(),
    );
    state
        .db(move |db| {
            db.add_feature(&NewFeature {
                id: &fid,
                channel_id: &cid,
                product_id: &product.id,
                created_by: &created_by,
                name: req.name.trim(),
                description: req.description.as_deref(),
                deadline: req.deadline,
                tech_lead_id: tech_lead_id.as_deref(),
            })
        })
        .await?;

    info!("Feature {} added by {}", feature_id, current.user.username);
    Ok((
        StatusCode::CREATED,
        Json(AddFeatureResponse {
            feature_id,
            channel_id,
        }),
    ))
}

/// PATCH /productchannel/deprecate
pub async fn deprecate(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ProductStatusResponse>, ApiError> {
    state
        .authorize(&current.user, Permission::DeprecateChannel)
        .await?;
    let product = owned_product(&state, &current).await?;

    let (pid, pm_id) = (product.id.clone(), current.user.user_id.clone());
    if !state.db(move |db| db.deprecate_product(&pid, &pm_id)).await? {
        return Err(ApiError::not_found("Product not found"));
    }

    info!("Product {} deprecated", product.id);
    Ok(Json(ProductStatusResponse {
        product_id: product.id,
        status: ProductStatus::Deprecated,
    }))
}

/// GET /productchannel/members
pub async fn members(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let product_id = current.product_id()?.to_string();
    let rows = state.db(move |db| db.product_members(&product_id)).await?;
    Ok(Json(rows.into_iter().map(convert::member).collect()))
}

/// GET /productchannel/goals
pub async fn goals(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<GoalResponse>>, ApiError> {
    let product_id = current.product_id()?.to_string();
    let rows = state
        .db(move |db| db.list_goals_for_product(&product_id))
        .await?;
    Ok(Json(rows.into_iter().map(convert::goal).collect()))
}

/// GET /productchannel/report
pub async fn report(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ProductReport>, ApiError> {
    state
        .authorize(&current.user, Permission::ViewProductReport)
        .await?;
    let product = scoped_product(&state, &current).await?;

    let pid = product.id.clone();
    let rows = state.db(move |db| db.product_report(&pid)).await?;

    Ok(Json(ProductReport {
        status: product_status(&product),
        product_id: product.id,
        name: product.name,
        deadline: product.deadline,
        features: rows
            .into_iter()
            .map(|r| FeatureReport {
                feature_id: r.feature_id,
                name: r.name,
                deadline: r.deadline,
                tech_lead: r.tech_lead,
                goals_total: r.goals_total,
                goals_completed: r.goals_completed,
                commits_pending: r.commits_pending,
                commits_approved: r.commits_approved,
            })
            .collect(),
    }))
}

/// GET /productchannel/deadline
pub async fn get_deadline(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DeadlineResponse>, ApiError> {
    let product = scoped_product(&state, &current).await?;
    Ok(Json(DeadlineResponse {
        product_id: product.id,
        deadline: product.deadline,
    }))
}

/// PATCH /productchannel/deadline
pub async fn update_deadline(
    State(state): State<AppState>,
    current: CurrentUser,
    body: PendingJson<DeadlineRequest>,
) -> Result<Json<DeadlineResponse>, ApiError> {
    state
        .authorize(&current.user, Permission::UpdateDeadline)
        .await?;
    let req = body.parse()?;
    let product = owned_product(&state, &current).await?;

    let (pid, pm_id) = (product.id.clone(), current.user.user_id.clone());
    let deadline = req.deadline;
    if !state
        .db(move |db| db.set_product_deadline(&pid, &pm_id, deadline))
        .await?
    {
        return Err(ApiError::not_found("Product not found"));
    }

    Ok(Json(DeadlineResponse {
        product_id: product.id,
        deadline: Some(deadline),
    }))
}
