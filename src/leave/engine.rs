use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::error::{LeaveError, LeaveResult};
use super::stats::{BalanceSummary, BalanceView, summarize};
use super::working_days::DateSpan;
use crate::model::leave_balance::{AvailableBalance, BalanceRecord};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::store::{Approval, Decrement, LeaveStore};

/// Result of a successful consumption.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Consumption {
    pub balance: BalanceView,
    pub balance_before: f64,
    pub balance_after: f64,
    pub days_consumed: u32,
}

/// Balances for one employee, as answered to a query.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum BalanceReport {
    Single(BalanceView),
    All {
        employee_id: u64,
        balances: Vec<BalanceView>,
        summary: BalanceSummary,
    },
}

/// Role-agnostic leave accounting over an injected store.
#[derive(Clone)]
pub struct LeaveAccounting {
    store: Arc<dyn LeaveStore>,
}

impl LeaveAccounting {
    pub fn new(store: Arc<dyn LeaveStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn LeaveStore {
        self.store.as_ref()
    }

    async fn available(&self, employee_id: u64) -> LeaveResult<Vec<AvailableBalance>> {
        let records = self.store.list_balances(employee_id).await?;
        Ok(records.iter().map(AvailableBalance::from).collect())
    }

    /// One balance when `leave_type_id` is given, otherwise all of them with a summary.
    pub async fn balances(
        &self,
        employee_id: u64,
        leave_type_id: Option<u64>,
    ) -> LeaveResult<BalanceReport> {
        match leave_type_id {
            Some(leave_type_id) => match self.store.get_balance(employee_id, leave_type_id).await? {
                Some(record) => Ok(BalanceReport::Single(BalanceView::from(&record))),
                None => Err(LeaveError::BalanceNotFound {
                    employee_id,
                    leave_type_id,
                    available: self.available(employee_id).await?,
                }),
            },
            None => {
                let records = self.store.list_balances(employee_id).await?;
                if records.is_empty() {
                    return Err(LeaveError::NoBalances(employee_id));
                }
                let balances: Vec<BalanceView> = records.iter().map(BalanceView::from).collect();
                let summary = summarize(&balances);
                Ok(BalanceReport::All {
                    employee_id,
                    balances,
                    summary,
                })
            }
        }
    }

    /// Resolves the balance row and the working days `span` would take from it.
    async fn precheck(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        span: &DateSpan,
    ) -> LeaveResult<(BalanceRecord, u32)> {
        self.store
            .find_employee(employee_id)
            .await?
            .ok_or(LeaveError::EmployeeNotFound(employee_id))?;

        self.store
            .find_leave_type(leave_type_id)
            .await?
            .ok_or(LeaveError::LeaveTypeNotFound(leave_type_id))?;

        let Some(record) = self.store.get_balance(employee_id, leave_type_id).await? else {
            warn!(employee_id, leave_type_id, "No balance row for employee/leave type");
            return Err(LeaveError::BalanceNotFound {
                employee_id,
                leave_type_id,
                available: self.available(employee_id).await?,
            });
        };

        let requested_days = span.working_days();
        if f64::from(requested_days) > record.balance {
            return Err(self
                .insufficient(employee_id, record.balance, requested_days)
                .await);
        }

        Ok((record, requested_days))
    }

    /// Would `span` fit in the balance right now? Returns the working days it takes.
    pub async fn check(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        span: &DateSpan,
    ) -> LeaveResult<u32> {
        let (_, requested_days) = self.precheck(employee_id, leave_type_id, span).await?;
        Ok(requested_days)
    }

    /// Decrements the balance by the working days in `span`.
    ///
    /// The sufficiency check done here only produces a good error message;
    /// the store re-checks under its lock, so a concurrent consumer can still
    /// turn this into `InsufficientBalance`.
    #[instrument(name = "consume_balance", skip(self, span), fields(start = %span.start(), end = %span.end()))]
    pub async fn consume(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        span: DateSpan,
    ) -> LeaveResult<Consumption> {
        let (record, requested_days) = self.precheck(employee_id, leave_type_id, &span).await?;

        let outcome = self
            .store
            .decrement_balance(employee_id, leave_type_id, f64::from(requested_days))
            .await?;

        self.settle(record, requested_days, outcome).await
    }

    /// Approves a pending request and takes its working days from the balance.
    ///
    /// Status change and decrement are one store operation, so a request is
    /// never approved without its balance being debited. When the balance
    /// can't cover it the request stays pending.
    #[instrument(name = "approve_request", skip(self))]
    pub async fn approve(
        &self,
        request_id: u64,
        validator_id: Option<u64>,
    ) -> LeaveResult<(LeaveRequest, Consumption)> {
        let mut request = self
            .store
            .find_request(request_id)
            .await?
            .ok_or_else(|| LeaveError::not_found(format!("leave request {request_id}")))?;

        if request.status != <&str>::from(LeaveStatus::Pending) {
            return Err(LeaveError::already_processed(request_id, &request.status));
        }

        let span = DateSpan::new(request.start_date, request.end_date)?;
        let (record, requested_days) = self
            .precheck(request.employee_id, request.leave_type_id, &span)
            .await?;

        let outcome = match self
            .store
            .approve_request(request_id, validator_id, f64::from(requested_days))
            .await?
        {
            Approval::Decided(outcome) => outcome,
            Approval::NotPending(status) => {
                return Err(LeaveError::already_processed(request_id, &status));
            }
            Approval::RequestMissing => {
                return Err(LeaveError::not_found(format!("leave request {request_id}")));
            }
        };

        let consumption = self.settle(record, requested_days, outcome).await?;

        request.status = LeaveStatus::Approved.to_string();
        request.validator_id = validator_id;
        Ok((request, consumption))
    }

    /// Turns the store's decrement outcome into a consumption or the matching error.
    async fn settle(
        &self,
        record: BalanceRecord,
        requested_days: u32,
        outcome: Decrement,
    ) -> LeaveResult<Consumption> {
        let (employee_id, leave_type_id) = (record.employee_id, record.leave_type_id);

        match outcome {
            Decrement::Applied { before, after } => {
                info!(requested_days, before, after, "Leave balance consumed");
                let mut updated = record;
                updated.balance = after;
                Ok(Consumption {
                    balance: BalanceView::from(&updated),
                    balance_before: before,
                    balance_after: after,
                    days_consumed: requested_days,
                })
            }
            Decrement::Insufficient { current } => {
                warn!(requested_days, current, "Balance changed concurrently");
                Err(self.insufficient(employee_id, current, requested_days).await)
            }
            Decrement::Missing => Err(LeaveError::BalanceNotFound {
                employee_id,
                leave_type_id,
                available: self.available(employee_id).await?,
            }),
        }
    }

    async fn insufficient(&self, employee_id: u64, current: f64, requested_days: u32) -> LeaveError {
        match self.available(employee_id).await {
            Ok(available) => LeaveError::InsufficientBalance {
                current_balance: current,
                requested_days,
                available,
            },
            Err(err) => err,
        }
    }
}
