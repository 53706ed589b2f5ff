//! Request lifecycle manager
//!
//! Mediates every mutation of the service-request collection: role
//! gates, the status decision point, price and date rules, and the
//! role-scoped read path. Creation feeds the notification bridge.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::notify::NotificationBridge;
use crate::request::{
    transition_allowed, validate_selection, DateUpdate, NewServiceRequest, RequestDraft,
    RequestStats, RequestStatus, ServiceRequest, ADDITIONAL_SERVICES, MAIN_SERVICES,
};
use crate::session::Identity;
use crate::store::DataStore;
use crate::{Error, Result};

/// Lifecycle operations over service requests.
pub struct RequestService {
    store: Arc<dyn DataStore>,
    bridge: NotificationBridge,
}

impl RequestService {
    pub fn new(store: Arc<dyn DataStore>, bridge: NotificationBridge) -> Self {
        Self { store, bridge }
    }

    /// Create a request. Callable by any authenticated role.
    ///
    /// Status starts at `Pending`, `date_requested` is today, and the
    /// store assigns the next `REQ-NNN` number for the dealership. The
    /// unread counter is incremented afterward.
    pub async fn create(&self, actor: &Identity, new: NewServiceRequest) -> Result<ServiceRequest> {
        if new.stock_number.trim().is_empty() {
            return Err(Error::ValidationFailed(
                "Stock/VIN identifier is required".to_string(),
            ));
        }
        if new.price < Decimal::ZERO {
            return Err(Error::ValidationFailed(
                "Price cannot be negative".to_string(),
            ));
        }
        let main_services = validate_selection(&new.main_services, MAIN_SERVICES)?;
        let additional_services = validate_selection(&new.additional_services, ADDITIONAL_SERVICES)?;

        let now = Utc::now();
        let draft = RequestDraft {
            dealership_id: actor.dealership_id,
            requested_by: actor.email.clone(),
            manager: new.manager,
            stock_number: new.stock_number,
            po_number: new.po_number,
            description: new.description,
            year: new.year,
            make: new.make,
            model: new.model,
            color: new.color,
            date_requested: now.date_naive(),
            due_date: new.due_date,
            due_time: new.due_time,
            main_services,
            additional_services,
            price: new.price,
            status: RequestStatus::Pending,
            notes: new.notes,
            created_at: now,
        };

        let request = self
            .store
            .insert_request(draft)
            .await
            .map_err(Error::into_mutation_failure)?;
        self.bridge.record_created();

        info!(
            number = %request.request_number,
            requested_by = %request.requested_by,
            "Service request created"
        );
        Ok(request)
    }

    /// Update the status only. Admin/manager only.
    pub async fn set_status(
        &self,
        actor: &Identity,
        id: i64,
        status: RequestStatus,
    ) -> Result<ServiceRequest> {
        let mut request = self.load_for_mutation(actor, id).await?;
        if !transition_allowed(request.status, status) {
            return Err(Error::ValidationFailed(format!(
                "Transition {} -> {} is not allowed",
                request.status.as_str(),
                status.as_str()
            )));
        }
        request.status = status;
        self.apply(request).await
    }

    /// Update the price only. Admin/manager only; price must be
    /// non-negative.
    pub async fn set_price(
        &self,
        actor: &Identity,
        id: i64,
        price: Decimal,
    ) -> Result<ServiceRequest> {
        if price < Decimal::ZERO {
            return Err(Error::ValidationFailed(
                "Price cannot be negative".to_string(),
            ));
        }
        let mut request = self.load_for_mutation(actor, id).await?;
        request.price = price;
        self.apply(request).await
    }

    /// Merge the provided schedule sub-fields. Admin/manager only.
    pub async fn set_dates(
        &self,
        actor: &Identity,
        id: i64,
        dates: DateUpdate,
    ) -> Result<ServiceRequest> {
        let mut request = self.load_for_mutation(actor, id).await?;
        dates.apply_to(&mut request);
        self.apply(request).await
    }

    /// The requests visible to the caller, newest first.
    pub async fn list(&self, actor: &Identity) -> Result<Vec<ServiceRequest>> {
        let all = self.store.list_requests(actor.dealership_id).await?;
        Ok(all
            .into_iter()
            .filter(|request| request.visible_to(actor.role, &actor.email))
            .collect())
    }

    /// Statistics over the caller's visible set. Recomputed per read.
    pub async fn stats(&self, actor: &Identity) -> Result<RequestStats> {
        let visible = self.list(actor).await?;
        Ok(RequestStats::compute(&visible))
    }

    async fn load_for_mutation(&self, actor: &Identity, id: i64) -> Result<ServiceRequest> {
        if !actor.role.can_manage_requests() {
            return Err(Error::Forbidden(
                "Only admins and managers can modify requests".to_string(),
            ));
        }
        let request = self
            .store
            .get_request(id)
            .await?
            .filter(|request| request.dealership_id == actor.dealership_id)
            .ok_or_else(|| Error::NotFound(format!("Request {}", id)))?;
        Ok(request)
    }

    async fn apply(&self, request: ServiceRequest) -> Result<ServiceRequest> {
        self.store
            .update_request(request)
            .await
            .map_err(Error::into_mutation_failure)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::account::Role;
    use crate::session::LocalStorage;
    use crate::store::FileStore;

    fn identity(dealership: Uuid, email: &str, role: Role) -> Identity {
        Identity {
            account_id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: None,
            role,
            dealership_id: dealership,
        }
    }

    fn new_request(price: i64) -> NewServiceRequest {
        NewServiceRequest {
            stock_number: "STK-42".to_string(),
            description: "Detail before delivery".to_string(),
            main_services: vec!["Full Detail".to_string()],
            price: Decimal::from(price),
            ..Default::default()
        }
    }

    async fn build_service() -> (RequestService, NotificationBridge, Uuid, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(temp_dir.path().join("portal")).await.unwrap());
        let bridge = NotificationBridge::new(LocalStorage::in_memory());
        let service = RequestService::new(store, bridge.clone());
        (service, bridge, Uuid::new_v4(), temp_dir)
    }

    #[tokio::test]
    async fn create_sets_defaults_and_notifies() {
        let (service, bridge, dealership, _temp) = build_service().await;
        let rep = identity(dealership, "rep@x.com", Role::SalesRep);

        let request = service.create(&rep, new_request(150)).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.request_number, "REQ-001");
        assert_eq!(request.requested_by, "rep@x.com");
        assert_eq!(request.date_requested, Utc::now().date_naive());
        assert_eq!(bridge.unread(), 1);
    }

    #[tokio::test]
    async fn create_rejects_unknown_service_and_negative_price() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let rep = identity(dealership, "rep@x.com", Role::SalesRep);

        let mut bad_service = new_request(10);
        bad_service.main_services = vec!["Oil Change".to_string()];
        assert!(matches!(
            service.create(&rep, bad_service).await.unwrap_err(),
            Error::ValidationFailed(_)
        ));

        assert!(matches!(
            service.create(&rep, new_request(-1)).await.unwrap_err(),
            Error::ValidationFailed(_)
        ));
    }

    #[tokio::test]
    async fn sales_rep_cannot_mutate() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let rep = identity(dealership, "rep@x.com", Role::SalesRep);
        let request = service.create(&rep, new_request(50)).await.unwrap();

        let err = service
            .set_status(&rep, request.id, RequestStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let err = service
            .set_price(&rep, request.id, Decimal::from(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn manager_can_set_any_status() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let rep = identity(dealership, "rep@x.com", Role::SalesRep);
        let manager = identity(dealership, "mgr@x.com", Role::Manager);
        let request = service.create(&rep, new_request(50)).await.unwrap();

        // No ordering constraint: any transition is allowed, including
        // going straight to Completed and back again.
        let updated = service
            .set_status(&manager, request.id, RequestStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.status, RequestStatus::Completed);

        let updated = service
            .set_status(&manager, request.id, RequestStatus::Pending)
            .await
            .unwrap();
        assert_eq!(updated.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn set_dates_merges_across_calls() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let admin = identity(dealership, "admin@x.com", Role::Admin);
        let request = service.create(&admin, new_request(50)).await.unwrap();

        service
            .set_dates(
                &admin,
                request.id,
                DateUpdate {
                    start_date: Some("2024-01-01".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let updated = service
            .set_dates(
                &admin,
                request.id,
                DateUpdate {
                    start_time: Some("09:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(updated.start_time.as_deref(), Some("09:00"));
        assert!(updated.completion_date.is_none());
    }

    #[tokio::test]
    async fn set_price_updates_only_price() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let admin = identity(dealership, "admin@x.com", Role::Admin);
        let request = service.create(&admin, new_request(50)).await.unwrap();

        let updated = service
            .set_price(&admin, request.id, Decimal::from(125))
            .await
            .unwrap();
        assert_eq!(updated.price, Decimal::from(125));
        assert_eq!(updated.status, request.status);
        assert_eq!(updated.request_number, request.request_number);

        assert!(matches!(
            service
                .set_price(&admin, request.id, Decimal::from(-5))
                .await
                .unwrap_err(),
            Error::ValidationFailed(_)
        ));
    }

    #[tokio::test]
    async fn list_is_role_scoped_and_newest_first() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let rep_a = identity(dealership, "a@x.com", Role::SalesRep);
        let rep_b = identity(dealership, "b@x.com", Role::SalesRep);
        let admin = identity(dealership, "admin@x.com", Role::Admin);

        service.create(&rep_a, new_request(10)).await.unwrap();
        service.create(&rep_b, new_request(20)).await.unwrap();
        service.create(&rep_b, new_request(30)).await.unwrap();

        let visible_to_a = service.list(&rep_a).await.unwrap();
        assert_eq!(visible_to_a.len(), 1);
        assert!(visible_to_a.iter().all(|r| r.requested_by == "a@x.com"));

        let visible_to_admin = service.list(&admin).await.unwrap();
        assert_eq!(visible_to_admin.len(), 3);
        for pair in visible_to_admin.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[tokio::test]
    async fn stats_follow_the_visible_scope() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let rep = identity(dealership, "rep@x.com", Role::SalesRep);
        let admin = identity(dealership, "admin@x.com", Role::Admin);

        service.create(&rep, new_request(50)).await.unwrap();
        let in_progress = service.create(&rep, new_request(100)).await.unwrap();
        let completed = service.create(&admin, new_request(75)).await.unwrap();
        service
            .set_status(&admin, in_progress.id, RequestStatus::InProgress)
            .await
            .unwrap();
        service
            .set_status(&admin, completed.id, RequestStatus::Completed)
            .await
            .unwrap();

        let admin_stats = service.stats(&admin).await.unwrap();
        assert_eq!(admin_stats.amount_due, Decimal::from(150));
        assert_eq!(admin_stats.amount_paid, Decimal::from(75));

        // The rep's stats cover only self-authored requests.
        let rep_stats = service.stats(&rep).await.unwrap();
        assert_eq!(rep_stats.total, 2);
        assert_eq!(rep_stats.amount_due, Decimal::from(150));
        assert_eq!(rep_stats.amount_paid, Decimal::ZERO);
    }

    #[tokio::test]
    async fn mutations_are_dealership_scoped() {
        let (service, _bridge, dealership, _temp) = build_service().await;
        let rep = identity(dealership, "rep@x.com", Role::SalesRep);
        let request = service.create(&rep, new_request(50)).await.unwrap();

        let outsider = identity(Uuid::new_v4(), "other@y.com", Role::Admin);
        let err = service
            .set_status(&outsider, request.id, RequestStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
