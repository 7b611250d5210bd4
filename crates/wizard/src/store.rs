use examdesk_gateway::{ChangeSet, EntityDraft, GatewayClient, GatewayError, StudentRecord};

/// The record mutations the flows need. The gateway client is the real
/// implementation; tests use in-memory fakes.
pub trait RecordStore {
    fn create(&self, draft: &EntityDraft) -> Result<(), GatewayError>;
    fn fetch(&self, id: &str) -> Result<Vec<StudentRecord>, GatewayError>;
    fn update(&self, id: &str, year: &str, changes: &ChangeSet) -> Result<(), GatewayError>;
    fn delete(&self, id: &str, year: &str) -> Result<(), GatewayError>;
}

impl RecordStore for GatewayClient {
    fn create(&self, draft: &EntityDraft) -> Result<(), GatewayError> {
        self.create_student(draft).map(|_| ())
    }

    fn fetch(&self, id: &str) -> Result<Vec<StudentRecord>, GatewayError> {
        self.fetch_student(id)
    }

    fn update(&self, id: &str, year: &str, changes: &ChangeSet) -> Result<(), GatewayError> {
        self.update_student(id, year, changes).map(|_| ())
    }

    fn delete(&self, id: &str, year: &str) -> Result<(), GatewayError> {
        self.delete_student(id, year).map(|_| ())
    }
}
