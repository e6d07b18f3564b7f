/// Backend job handles are Celery task UUIDs.
pub type TaskId = uuid::Uuid;

/// French municipality code (code INSEE), e.g. `"29190"`.
pub type Insee = String;
