use hookreg_core::{Table, Target};

pub fn audit_access_granted(username: &str, target: &Target, reason: &str) {
    tracing::info!(
        target: "audit",
        event = "access_granted",
        username = username,
        resource = %target,
        reason = reason,
        "access granted"
    );
}

pub fn audit_access_denied(username: &str, target: &Target, reason: &str) {
    tracing::warn!(
        target: "audit",
        event = "access_denied",
        username = username,
        resource = %target,
        reason = reason,
        "access denied"
    );
}

pub fn audit_record_inserted(table: Table, id: &str) {
    tracing::info!(
        target: "audit",
        event = "record_inserted",
        table = table.as_str(),
        record_id = id,
        "record inserted"
    );
}

pub fn audit_record_updated(table: Table, id: &str, field_count: usize) {
    tracing::info!(
        target: "audit",
        event = "record_updated",
        table = table.as_str(),
        record_id = id,
        field_count = field_count,
        "record updated"
    );
}

pub fn audit_records_deleted(table: Table, scope: &str, count: u64) {
    tracing::info!(
        target: "audit",
        event = "records_deleted",
        table = table.as_str(),
        scope = scope,
        count = count,
        "records deleted"
    );
}
