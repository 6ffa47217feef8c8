use uuid::Uuid;

use dealflow_core::dataroom::{Document, DocumentPermission};
use dealflow_core::store::{DocumentStore, PermissionStore};
use dealflow_core::{DealflowError, Result};

use super::MAX_DELAY_DAYS;
use crate::ledger::SharingLedger;

/// Document and stage-permission management.
#[derive(Clone)]
pub struct DataroomService {
    documents: DocumentStore,
    permissions: PermissionStore,
    ledger: SharingLedger,
}

impl DataroomService {
    /// Create the service over its stores and the ledger.
    pub fn new(
        documents: DocumentStore,
        permissions: PermissionStore,
        ledger: SharingLedger,
    ) -> Self {
        Self {
            documents,
            permissions,
            ledger,
        }
    }

    /// Save a document record.
    pub async fn save_document(&self, document: Document) -> Result<Document> {
        if document.name.trim().is_empty() {
            return Err(DealflowError::Validation(
                "Document name cannot be empty".to_string(),
            ));
        }
        self.documents.put(&document).await?;
        tracing::info!(document_id = %document.id, name = %document.name, "Saved document");
        Ok(document)
    }

    /// Fetch one document.
    pub async fn get_document(&self, document_id: Uuid) -> Result<Document> {
        self.documents.require(document_id).await
    }

    /// All documents for an owner.
    pub async fn list_documents(&self, owner_id: Uuid) -> Result<Vec<Document>> {
        self.documents.for_owner(owner_id).await
    }

    /// Delete a document.
    ///
    /// No cascade: existing ledger entries stay (access already granted),
    /// and rules or permissions that still reference the id skip it at
    /// execution time.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<()> {
        self.documents.delete(document_id).await?;
        tracing::info!(document_id = %document_id, "Deleted document");
        Ok(())
    }

    /// Save a stage permission for a document.
    ///
    /// Validates the delay and that the document exists, keeps at most
    /// one permission per `(document, required_stage)` pair by replacing
    /// any previous one, then retroactively shares with every lead
    /// already at or past the required stage. Retroactive failures are
    /// logged, never returned.
    pub async fn save_permission(
        &self,
        permission: DocumentPermission,
    ) -> Result<DocumentPermission> {
        if permission.delay_days > MAX_DELAY_DAYS {
            return Err(DealflowError::Validation(format!(
                "Permission delay of {} days exceeds the {}-day maximum",
                permission.delay_days, MAX_DELAY_DAYS
            )));
        }
        self.documents.require(permission.document_id).await?;

        if let Some(existing) = self
            .permissions
            .find(permission.document_id, permission.required_stage)
            .await?
        {
            if existing.id != permission.id {
                self.permissions.delete(existing.id).await?;
            }
        }
        self.permissions.put(&permission).await?;

        let retroactive = self
            .ledger
            .share_with_eligible_leads(
                permission.owner_id,
                permission.document_id,
                permission.required_stage,
            )
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(
                    permission_id = %permission.id,
                    error = %e,
                    "Retroactive sharing failed"
                );
                0
            });

        tracing::info!(
            permission_id = %permission.id,
            document_id = %permission.document_id,
            stage = %permission.required_stage,
            retroactive_shares = retroactive,
            "Saved document permission"
        );
        Ok(permission)
    }

    /// All permissions for an owner.
    pub async fn list_permissions(&self, owner_id: Uuid) -> Result<Vec<DocumentPermission>> {
        self.permissions.for_owner(owner_id).await
    }

    /// Permissions attached to one document.
    pub async fn permissions_for_document(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<DocumentPermission>> {
        self.permissions.for_document(document_id).await
    }

    /// Delete a permission. Already-granted shares stay.
    pub async fn delete_permission(&self, permission_id: Uuid) -> Result<()> {
        self.permissions.delete(permission_id).await?;
        tracing::info!(permission_id = %permission_id, "Deleted permission");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRig;
    use dealflow_core::pipeline::Stage;
    use dealflow_core::testing::document;

    fn service(rig: &TestRig) -> DataroomService {
        DataroomService::new(
            rig.documents.clone(),
            rig.permissions.clone(),
            rig.ledger.clone(),
        )
    }

    #[tokio::test]
    async fn test_save_document_rejects_blank_name() {
        let rig = TestRig::new();
        let svc = service(&rig);

        let mut doc = document(rig.owner_id, "Deck");
        doc.name = "  ".to_string();

        let result = svc.save_document(doc).await;
        assert!(matches!(result, Err(DealflowError::Validation(_))));
    }

    #[tokio::test]
    async fn test_save_permission_requires_document() {
        let rig = TestRig::new();
        let svc = service(&rig);

        let permission =
            DocumentPermission::new(rig.owner_id, Uuid::new_v4(), Stage::Meeting);
        let result = svc.save_permission(permission).await;
        assert!(matches!(result, Err(DealflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_permission_caps_delay() {
        let rig = TestRig::new();
        let svc = service(&rig);
        let doc = rig.seed_document("Financials").await;

        let permission = DocumentPermission::new(rig.owner_id, doc.id, Stage::Meeting)
            .with_delay_days(u32::MAX);
        let result = svc.save_permission(permission).await;
        assert!(matches!(result, Err(DealflowError::Validation(_))));

        let at_cap = DocumentPermission::new(rig.owner_id, doc.id, Stage::Meeting)
            .with_delay_days(MAX_DELAY_DAYS);
        svc.save_permission(at_cap).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_permission_replaces_stage_pair() {
        let rig = TestRig::new();
        let svc = service(&rig);
        let doc = rig.seed_document("Financials").await;

        let first = DocumentPermission::new(rig.owner_id, doc.id, Stage::Meeting);
        svc.save_permission(first.clone()).await.unwrap();

        let second = DocumentPermission::new(rig.owner_id, doc.id, Stage::Meeting)
            .with_delay_days(5);
        svc.save_permission(second.clone()).await.unwrap();

        let listed = svc.permissions_for_document(doc.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[0].delay_days, 5);

        // A different stage coexists.
        let other_stage =
            DocumentPermission::new(rig.owner_id, doc.id, Stage::DueDiligence);
        svc.save_permission(other_stage).await.unwrap();
        assert_eq!(svc.permissions_for_document(doc.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_permission_shares_retroactively() {
        let rig = TestRig::new();
        let svc = service(&rig);
        let doc = rig.seed_document("Financials").await;

        let early = rig.seed_lead(Stage::Contacted).await;
        let qualified = rig.seed_lead(Stage::TermSheet).await;

        let permission =
            DocumentPermission::new(rig.owner_id, doc.id, Stage::DueDiligence);
        svc.save_permission(permission).await.unwrap();

        assert!(rig.ledger.shares_for_lead(early.id).await.unwrap().is_empty());
        assert_eq!(
            rig.ledger.shares_for_lead(qualified.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_document_keeps_existing_shares() {
        let rig = TestRig::new();
        let svc = service(&rig);
        let doc = rig.seed_document("Deck").await;
        let lead = rig.seed_lead(Stage::Meeting).await;

        rig.ledger.share_document(lead.id, doc.id).await.unwrap();
        svc.delete_document(doc.id).await.unwrap();

        assert_eq!(rig.ledger.shares_for_lead(lead.id).await.unwrap().len(), 1);
        assert!(matches!(
            svc.get_document(doc.id).await,
            Err(DealflowError::NotFound(_))
        ));
    }
}
