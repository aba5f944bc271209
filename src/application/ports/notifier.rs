use uuid::Uuid;

/// Side channel told about fresh admissions.
///
/// Implementations must return immediately: delivery happens out of band and a
/// failed delivery never affects the admission that triggered it.
pub trait AdmissionNotifier: Send + Sync {
    fn notify_admitted(&self, user_id: Uuid, event_id: Uuid);
}
