use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{Approval, Decrement, LeaveStore, StoreError};
use crate::model::employee::Employee;
use crate::model::leave_balance::BalanceRecord;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;

#[derive(Debug, Default)]
struct Inner {
    employees: HashMap<u64, Employee>,
    leave_types: HashMap<u64, LeaveType>,
    balances: BTreeMap<(u64, u64), f64>,
    requests: HashMap<u64, LeaveRequest>,
}

impl Inner {
    fn decrement(&mut self, employee_id: u64, leave_type_id: u64, days: f64) -> Decrement {
        let Some(balance) = self.balances.get_mut(&(employee_id, leave_type_id)) else {
            return Decrement::Missing;
        };

        if days > *balance {
            return Decrement::Insufficient { current: *balance };
        }

        let before = *balance;
        *balance -= days;
        Decrement::Applied {
            before,
            after: *balance,
        }
    }
}

/// Lock-protected maps standing in for the database.
#[derive(Debug, Default)]
pub struct InMemoryLeaveStore {
    inner: RwLock<Inner>,
}

impl InMemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::connection("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::connection("in-memory store lock poisoned"))
    }

    pub fn with_employee(self, employee: Employee) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.employees.insert(employee.id, employee);
        }
        self
    }

    pub fn with_leave_type(self, leave_type: LeaveType) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.leave_types.insert(leave_type.id, leave_type);
        }
        self
    }

    pub fn with_balance(self, employee_id: u64, leave_type_id: u64, balance: f64) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.balances.insert((employee_id, leave_type_id), balance);
        }
        self
    }

    pub fn with_request(self, request: LeaveRequest) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.requests.insert(request.id, request);
        }
        self
    }

    pub fn request_status(&self, request_id: u64) -> Option<String> {
        self.read()
            .ok()
            .and_then(|inner| inner.requests.get(&request_id).map(|r| r.status.clone()))
    }

    pub fn balance(&self, employee_id: u64, leave_type_id: u64) -> Option<f64> {
        self.read()
            .ok()
            .and_then(|inner| inner.balances.get(&(employee_id, leave_type_id)).copied())
    }
}

fn record(inner: &Inner, employee_id: u64, leave_type_id: u64, balance: f64) -> Option<BalanceRecord> {
    inner.leave_types.get(&leave_type_id).map(|leave_type| BalanceRecord {
        employee_id,
        leave_type_id,
        leave_type_name: leave_type.name.clone(),
        annual_quota: leave_type.annual_quota,
        balance,
    })
}

#[async_trait]
impl LeaveStore for InMemoryLeaveStore {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self.read()?.employees.get(&employee_id).cloned())
    }

    async fn find_leave_type(&self, leave_type_id: u64) -> Result<Option<LeaveType>, StoreError> {
        Ok(self.read()?.leave_types.get(&leave_type_id).cloned())
    }

    async fn get_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
    ) -> Result<Option<BalanceRecord>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .balances
            .get(&(employee_id, leave_type_id))
            .and_then(|balance| record(&inner, employee_id, leave_type_id, *balance)))
    }

    async fn list_balances(&self, employee_id: u64) -> Result<Vec<BalanceRecord>, StoreError> {
        let inner = self.read()?;
        let mut records: Vec<_> = inner
            .balances
            .range((employee_id, 0)..=(employee_id, u64::MAX))
            .filter_map(|((_, leave_type_id), balance)| {
                record(&inner, employee_id, *leave_type_id, *balance)
            })
            .collect();
        records.sort_by(|a, b| a.leave_type_name.cmp(&b.leave_type_name));
        Ok(records)
    }

    async fn decrement_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        days: f64,
    ) -> Result<Decrement, StoreError> {
        Ok(self.write()?.decrement(employee_id, leave_type_id, days))
    }

    async fn find_request(&self, request_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.read()?.requests.get(&request_id).cloned())
    }

    async fn approve_request(
        &self,
        request_id: u64,
        validator_id: Option<u64>,
        days: f64,
    ) -> Result<Approval, StoreError> {
        let mut inner = self.write()?;

        let Some(request) = inner.requests.get(&request_id) else {
            return Ok(Approval::RequestMissing);
        };
        if request.status != <&str>::from(LeaveStatus::Pending) {
            return Ok(Approval::NotPending(request.status.clone()));
        }
        let (employee_id, leave_type_id) = (request.employee_id, request.leave_type_id);

        let outcome = inner.decrement(employee_id, leave_type_id, days);
        if matches!(outcome, Decrement::Applied { .. })
            && let Some(request) = inner.requests.get_mut(&request_id)
        {
            request.status = LeaveStatus::Approved.to_string();
            request.validator_id = validator_id;
        }

        Ok(Approval::Decided(outcome))
    }
}
