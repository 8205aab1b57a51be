//! SQL schema for the LifeLink SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS donors (
    donor_id           TEXT PRIMARY KEY,
    display_name       TEXT NOT NULL,
    blood_group        TEXT,            -- 'O-' .. 'AB+'; NULL while incomplete
    is_blood_donor     INTEGER NOT NULL DEFAULT 1,
    last_donation_date TEXT,            -- ISO date; derived from donations
    city               TEXT,
    state              TEXT,
    show_contact       INTEGER NOT NULL DEFAULT 0,
    contact_number     TEXT,
    created_at         TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- Donations are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS donations (
    donation_id TEXT PRIMARY KEY,
    donor_id    TEXT NOT NULL REFERENCES donors(donor_id),
    donated_on  TEXT NOT NULL,
    location    TEXT,
    units       INTEGER NOT NULL CHECK (units >= 1),
    notes       TEXT,
    recorded_at TEXT NOT NULL
);

-- Requisitions are never deleted; status is the only column that changes
-- after insert (plus the derived willing_donors counter), and only through
-- the guarded UPDATE in store.rs.
CREATE TABLE IF NOT EXISTS requisitions (
    requisition_id       TEXT PRIMARY KEY,
    requester_id         TEXT NOT NULL,
    patient_name         TEXT NOT NULL,
    hospital_name        TEXT NOT NULL,
    contact_number       TEXT NOT NULL,
    blood_group          TEXT NOT NULL,
    units_needed         INTEGER NOT NULL CHECK (units_needed >= 1),
    urgency              TEXT NOT NULL,   -- 'low' | 'medium' | 'high'
    city                 TEXT,
    state                TEXT,
    required_by          TEXT NOT NULL,
    allow_contact_reveal INTEGER NOT NULL DEFAULT 0,
    medical_condition    TEXT,
    additional_notes     TEXT,
    status               TEXT NOT NULL DEFAULT 'active',
    willing_donors       INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL
);

-- One row per (requisition, donor) pair; the UNIQUE constraint is the
-- idempotency boundary for notification fan-out.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    requisition_id  TEXT NOT NULL REFERENCES requisitions(requisition_id),
    donor_id        TEXT NOT NULL REFERENCES donors(donor_id),
    message         TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'sent',
    dispatch_failed INTEGER NOT NULL DEFAULT 0,
    sent_at         TEXT NOT NULL,
    delivered_at    TEXT,
    read_at         TEXT,
    UNIQUE (requisition_id, donor_id)
);

-- At most one response per (requisition, donor) pair; a later response
-- replaces the earlier one in place.
CREATE TABLE IF NOT EXISTS responses (
    response_id    TEXT PRIMARY KEY,
    requisition_id TEXT NOT NULL REFERENCES requisitions(requisition_id),
    donor_id       TEXT NOT NULL REFERENCES donors(donor_id),
    value          TEXT NOT NULL,   -- 'willing' | 'not_available' | 'not_suitable'
    message        TEXT,
    responded_at   TEXT NOT NULL,
    UNIQUE (requisition_id, donor_id)
);

CREATE INDEX IF NOT EXISTS donations_donor_idx       ON donations(donor_id);
CREATE INDEX IF NOT EXISTS donors_group_idx          ON donors(blood_group);
CREATE INDEX IF NOT EXISTS requisitions_status_idx   ON requisitions(status);
CREATE INDEX IF NOT EXISTS requisitions_requester_idx ON requisitions(requester_id);
CREATE INDEX IF NOT EXISTS notifications_req_idx     ON notifications(requisition_id);
CREATE INDEX IF NOT EXISTS responses_req_idx         ON responses(requisition_id);

PRAGMA user_version = 1;
";
