//! HTTP surface: request bodies, id parsing and the route table.

use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};
use bson::oid::ObjectId;
use serde::Deserialize;

use crate::auth::{AuthenticatedUser, SessionIssuer};
use crate::error::{AppError, AppResult};
use crate::expenses::{ExpenseRule, ExpenseService};
use crate::groups::{GroupService, NewGroup};
use crate::identity::{IdentityService, NewUser};
use crate::schemas::{ExpensePatch, ExpenseSplit, NewExpense};
use crate::signin::SignInService;
use crate::store::{ExpenseStore, GroupStore, Store, UserStore};
use crate::views::{ExpenseView, GroupCreatedView, SignInView, UserView};

/// Services shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityService,
    pub groups: GroupService,
    pub expenses: ExpenseService,
    pub sign_in: SignInService,
    pub sessions: SessionIssuer,
}

impl AppState {
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        sessions: SessionIssuer,
        rules: Vec<Arc<dyn ExpenseRule>>,
    ) -> Self {
        let users: Arc<dyn UserStore> = store.clone();
        let groups: Arc<dyn GroupStore> = store.clone();
        let expenses: Arc<dyn ExpenseStore> = store;

        let identity = IdentityService::new(users.clone());
        Self {
            groups: GroupService::new(users.clone(), groups.clone()),
            expenses: ExpenseService::new(expenses.clone(), groups.clone()).with_rules(rules),
            sign_in: SignInService::new(
                identity.clone(),
                users,
                groups,
                expenses,
                sessions.clone(),
            ),
            identity,
            sessions,
        }
    }
}

/// Registers shared state, body/query error mapping and every route.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(state.sessions.clone()))
            .app_data(web::Data::new(state))
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _| AppError::InvalidInput(err.to_string()).into()),
            )
            .app_data(
                web::QueryConfig::default()
                    .error_handler(|err, _| AppError::InvalidInput(err.to_string()).into()),
            )
            .service(health)
            .service(create_user)
            .service(sign_in)
            .service(get_user_by_email)
            .service(get_user_by_phone_number)
            .service(create_group)
            .service(create_expense)
            .service(get_expense)
            .service(update_expense)
            .service(delete_expense)
            .service(get_expenses_by_group);
    }
}

fn parse_id(field: &str, value: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(value)
        .map_err(|_| AppError::InvalidInput(format!("{field} is not a valid id")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    name: String,
    email: String,
    mobile_number: String,
    password: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(request: CreateUserRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            mobile_number: request.mobile_number,
            password: request.password,
        }
    }
}

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhoneNumberQuery {
    phone_number: String,
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    name: String,
    #[serde(default)]
    emails: Vec<String>,
    creator: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplitRequest {
    user_id: String,
    amount: f64,
}

impl SplitRequest {
    fn parse(self) -> AppResult<ExpenseSplit> {
        Ok(ExpenseSplit {
            user_id: parse_id("split.userId", &self.user_id)?,
            amount: self.amount,
        })
    }
}

fn parse_split(split: Vec<SplitRequest>) -> AppResult<Vec<ExpenseSplit>> {
    split.into_iter().map(SplitRequest::parse).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateExpenseRequest {
    group_id: String,
    paid_by: String,
    created_by: String,
    amount: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    split: Vec<SplitRequest>,
}

impl TryFrom<CreateExpenseRequest> for NewExpense {
    type Error = AppError;

    fn try_from(request: CreateExpenseRequest) -> AppResult<Self> {
        Ok(Self {
            group_id: parse_id("groupId", &request.group_id)?,
            paid_by: parse_id("paidBy", &request.paid_by)?,
            created_by: parse_id("createdBy", &request.created_by)?,
            amount: request.amount,
            description: request.description,
            split: parse_split(request.split)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateExpenseRequest {
    group_id: Option<String>,
    paid_by: Option<String>,
    amount: Option<f64>,
    description: Option<String>,
    split: Option<Vec<SplitRequest>>,
}

impl TryFrom<UpdateExpenseRequest> for ExpensePatch {
    type Error = AppError;

    fn try_from(request: UpdateExpenseRequest) -> AppResult<Self> {
        Ok(Self {
            group_id: request.group_id.map(|id| parse_id("groupId", &id)).transpose()?,
            paid_by: request.paid_by.map(|id| parse_id("paidBy", &id)).transpose()?,
            amount: request.amount,
            description: request.description,
            split: request.split.map(parse_split).transpose()?,
        })
    }
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

#[post("/api/users")]
async fn create_user(
    state: web::Data<AppState>,
    json: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    let user = state.identity.register(json.into_inner().into()).await?;
    Ok(HttpResponse::Created().json(UserView::from(user)))
}

#[post("/api/signin")]
async fn sign_in(
    state: web::Data<AppState>,
    json: web::Json<SignInRequest>,
) -> AppResult<HttpResponse> {
    let credentials = json.into_inner();
    let sign_in = state
        .sign_in
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    Ok(HttpResponse::Ok().json(SignInView::from(sign_in)))
}

#[get("/api/user/email")]
async fn get_user_by_email(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    query: web::Query<EmailQuery>,
) -> AppResult<HttpResponse> {
    let user = state.identity.find_by_email(&query.email).await?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

#[get("/api/user/phoneNumber")]
async fn get_user_by_phone_number(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    query: web::Query<PhoneNumberQuery>,
) -> AppResult<HttpResponse> {
    let user = state.identity.find_by_mobile_number(&query.phone_number).await?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

#[post("/api/groups")]
async fn create_group(
    state: web::Data<AppState>,
    json: web::Json<CreateGroupRequest>,
) -> AppResult<HttpResponse> {
    let request = json.into_inner();
    let creation = state
        .groups
        .create_group(NewGroup {
            name: request.name,
            creator_email: request.creator,
            member_emails: request.emails,
        })
        .await?;
    Ok(HttpResponse::Created().json(GroupCreatedView::from(creation)))
}

#[post("/api/expenses")]
async fn create_expense(
    state: web::Data<AppState>,
    json: web::Json<CreateExpenseRequest>,
) -> AppResult<HttpResponse> {
    let expense = state.expenses.create(json.into_inner().try_into()?).await?;
    Ok(HttpResponse::Created().json(ExpenseView::from(expense)))
}

#[get("/api/expenses/{id}")]
async fn get_expense(state: web::Data<AppState>, id: web::Path<String>) -> AppResult<HttpResponse> {
    // A malformed id cannot name an existing expense.
    let id = ObjectId::parse_str(id.as_str()).map_err(|_| AppError::NotFound("Expense"))?;
    let expense = state.expenses.get(id).await?;
    Ok(HttpResponse::Ok().json(ExpenseView::from(expense)))
}

#[put("/api/expenses/{id}")]
async fn update_expense(
    state: web::Data<AppState>,
    id: web::Path<String>,
    json: web::Json<UpdateExpenseRequest>,
) -> AppResult<HttpResponse> {
    let id = parse_id("id", &id)?;
    state.expenses.update(id, json.into_inner().try_into()?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/api/expenses/{id}")]
async fn delete_expense(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = parse_id("id", &id)?;
    state.expenses.delete(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/api/groups/{group_id}/expenses")]
async fn get_expenses_by_group(
    state: web::Data<AppState>,
    group_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let group_id = parse_id("groupId", &group_id)?;
    let expenses = state.expenses.list_by_group(group_id).await?;
    Ok(HttpResponse::Ok().json(expenses.into_iter().map(ExpenseView::from).collect::<Vec<_>>()))
}
