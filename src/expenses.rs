//! Expense CRUD and the optional validation stage in front of it.
//!
//! By default expenses are stored exactly as submitted: neither the payer nor
//! the split users are checked against the group, and split amounts need not
//! add up to the total. Stricter policies are added as [`ExpenseRule`]s.

use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::schemas::{Expense, ExpensePatch, Group, NewExpense};
use crate::store::{ExpenseStore, GroupStore};

/// A consistency check run before an expense is written.
pub trait ExpenseRule: Send + Sync {
    /// Whether [`ExpenseRule::check`] needs the expense's group.
    fn needs_group(&self) -> bool {
        false
    }

    /// Returns the violated rule as a single-line message.
    fn check(&self, expense: &Expense, group: Option<&Group>) -> Result<(), String>;
}

/// Split shares must add up to the total, within `tolerance`.
#[derive(Clone, Copy, Debug)]
pub struct SplitSumMatchesAmount {
    pub tolerance: f64,
}

impl Default for SplitSumMatchesAmount {
    fn default() -> Self {
        Self { tolerance: 0.005 }
    }
}

impl ExpenseRule for SplitSumMatchesAmount {
    fn check(&self, expense: &Expense, _: Option<&Group>) -> Result<(), String> {
        let total = expense.split_total();
        if (total - expense.amount).abs() > self.tolerance {
            return Err(format!(
                "split amounts add up to {total}, expected {}",
                expense.amount
            ));
        }
        Ok(())
    }
}

/// The payer and every split user must be members of the expense's group.
#[derive(Clone, Copy, Debug, Default)]
pub struct SplitMembersBelongToGroup;

impl ExpenseRule for SplitMembersBelongToGroup {
    fn needs_group(&self) -> bool {
        true
    }

    fn check(&self, expense: &Expense, group: Option<&Group>) -> Result<(), String> {
        let group = group.ok_or_else(|| format!("group {} does not exist", expense.group_id))?;
        if !group.has_member(&expense.paid_by) {
            return Err(format!("payer {} is not a member of the group", expense.paid_by));
        }
        match expense.split.iter().find(|share| !group.has_member(&share.user_id)) {
            Some(share) => Err(format!(
                "split user {} is not a member of the group",
                share.user_id
            )),
            None => Ok(()),
        }
    }
}

/// Rules enabled by `STRICT_EXPENSE_VALIDATION`.
pub fn strict_rules() -> Vec<Arc<dyn ExpenseRule>> {
    vec![
        Arc::new(SplitSumMatchesAmount::default()),
        Arc::new(SplitMembersBelongToGroup),
    ]
}

fn check_amount(amount: f64) -> AppResult<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(AppError::InvalidInput("amount must be a non-negative number".to_string()))
    }
}

#[derive(Clone)]
pub struct ExpenseService {
    expenses: Arc<dyn ExpenseStore>,
    groups: Arc<dyn GroupStore>,
    rules: Vec<Arc<dyn ExpenseRule>>,
}

impl ExpenseService {
    pub fn new(expenses: Arc<dyn ExpenseStore>, groups: Arc<dyn GroupStore>) -> Self {
        Self {
            expenses,
            groups,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<Arc<dyn ExpenseRule>>) -> Self {
        self.rules = rules;
        self
    }

    #[tracing::instrument(skip_all, fields(group_id = %request.group_id))]
    pub async fn create(&self, request: NewExpense) -> AppResult<Expense> {
        check_amount(request.amount)?;
        let expense = request.into_expense(Utc::now());
        self.validate(&expense).await?;

        self.expenses.insert_expense(&expense).await?;
        tracing::info!(expense_id = %expense.id, "created expense");
        Ok(expense)
    }

    pub async fn get(&self, id: ObjectId) -> AppResult<Expense> {
        self.expenses
            .find_expense(id)
            .await?
            .ok_or(AppError::NotFound("Expense"))
    }

    /// Merges `patch` into the expense and refreshes `modifiedAt`, even when
    /// the patch is empty.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: ObjectId, patch: ExpensePatch) -> AppResult<()> {
        if let Some(amount) = patch.amount {
            check_amount(amount)?;
        }
        if !self.rules.is_empty() {
            let mut merged = self.get(id).await?;
            merged.merge(&patch);
            self.validate(&merged).await?;
        }

        if self.expenses.update_expense(id, &patch, Utc::now()).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Expense"))
        }
    }

    /// Succeeds whether or not the expense existed.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ObjectId) -> AppResult<()> {
        self.expenses.delete_expense(id).await?;
        Ok(())
    }

    /// Expenses of a group in store order.
    pub async fn list_by_group(&self, group_id: ObjectId) -> AppResult<Vec<Expense>> {
        Ok(self.expenses.find_expenses_by_group(group_id).await?)
    }

    async fn validate(&self, expense: &Expense) -> AppResult<()> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let group = if self.rules.iter().any(|rule| rule.needs_group()) {
            self.groups.find_group(expense.group_id).await?
        } else {
            None
        };
        for rule in &self.rules {
            rule.check(expense, group.as_ref()).map_err(AppError::InvalidInput)?;
        }
        Ok(())
    }
}
