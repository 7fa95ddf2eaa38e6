//! Schema migration for the QMS tables.

use diesel_async::AsyncPgConnection;
use diesel_async::SimpleAsyncConnection;

/// SQL migration for all QMS tables.
///
/// Idempotent: every statement is `IF NOT EXISTS`, so it runs on each start.
pub const MIGRATION_SQL: &str = r#"
-- ================================================================
-- Users & training
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_users (
    id              BIGSERIAL PRIMARY KEY,
    email           VARCHAR(255) NOT NULL UNIQUE,
    name            VARCHAR(255) NOT NULL,
    password_hash   VARCHAR(255) NOT NULL,
    role            VARCHAR(32) NOT NULL DEFAULT 'worker',
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_courses (
    id              BIGSERIAL PRIMARY KEY,
    code            VARCHAR(64) NOT NULL UNIQUE,
    title           VARCHAR(255) NOT NULL,
    description     TEXT,
    validity_months INTEGER,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_training_records (
    id              BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL REFERENCES qms_users(id) ON DELETE CASCADE,
    course_id       BIGINT NOT NULL REFERENCES qms_courses(id) ON DELETE CASCADE,
    status          VARCHAR(32) NOT NULL DEFAULT 'NOT_STARTED',
    due_date        TIMESTAMPTZ,
    completed       TIMESTAMPTZ,
    score           INTEGER,
    document_url    TEXT,
    document_name   VARCHAR(255),
    notes           TEXT,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW(),
    UNIQUE (user_id, course_id)
);

-- ================================================================
-- Risk, hazards & incidents
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_risks (
    id              BIGSERIAL PRIMARY KEY,
    title           VARCHAR(255) NOT NULL,
    context         TEXT,
    category        VARCHAR(64) NOT NULL DEFAULT 'OPERATIONAL',
    likelihood      INTEGER NOT NULL CHECK (likelihood BETWEEN 1 AND 5),
    severity        INTEGER NOT NULL CHECK (severity BETWEEN 1 AND 5),
    controls        JSONB NOT NULL DEFAULT '[]',
    owner           VARCHAR(255),
    review_date     TIMESTAMPTZ,
    status          VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    iso_refs        JSONB NOT NULL DEFAULT '[]',
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_qms_risks_created ON qms_risks (create_date DESC);

CREATE TABLE IF NOT EXISTS qms_hazards (
    id              BIGSERIAL PRIMARY KEY,
    title           VARCHAR(255) NOT NULL,
    area            VARCHAR(255),
    description     TEXT,
    likelihood      INTEGER NOT NULL CHECK (likelihood BETWEEN 1 AND 5),
    severity        INTEGER NOT NULL CHECK (severity BETWEEN 1 AND 5),
    residual_l      INTEGER CHECK (residual_l BETWEEN 1 AND 5),
    residual_s      INTEGER CHECK (residual_s BETWEEN 1 AND 5),
    controls        JSONB NOT NULL DEFAULT '[]',
    owner           VARCHAR(255),
    review_date     TIMESTAMPTZ,
    status          VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    iso_refs        JSONB NOT NULL DEFAULT '[]',
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_incidents (
    id                BIGSERIAL PRIMARY KEY,
    ref_number        VARCHAR(64),
    incident_type     VARCHAR(32) NOT NULL,
    occurred_at       TIMESTAMPTZ NOT NULL,
    location          VARCHAR(255),
    description       TEXT,
    people            JSONB NOT NULL DEFAULT '[]',
    severity_type     VARCHAR(32) NOT NULL,
    lost_time_days    INTEGER,
    hours_worked      DOUBLE PRECISION,
    immediate_actions TEXT,
    status            VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    iso_refs          JSONB NOT NULL DEFAULT '[]',
    active            BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid        BIGINT,
    create_date       TIMESTAMPTZ DEFAULT NOW(),
    write_uid         BIGINT,
    write_date        TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_qms_incidents_date ON qms_incidents (occurred_at DESC);

-- ================================================================
-- Audits
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_audit_types (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    description     TEXT,
    category        VARCHAR(32) NOT NULL,
    frequency       VARCHAR(32) NOT NULL,
    standard        VARCHAR(64),
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_audits (
    id                 BIGSERIAL PRIMARY KEY,
    audit_number       VARCHAR(32) NOT NULL UNIQUE,
    audit_type_id      BIGINT NOT NULL REFERENCES qms_audit_types(id),
    title              VARCHAR(255) NOT NULL,
    description        TEXT,
    scope              TEXT NOT NULL,
    objectives         TEXT,
    audit_standard     VARCHAR(64) NOT NULL,
    audit_criteria     TEXT,
    planned_start_date TIMESTAMPTZ NOT NULL,
    planned_end_date   TIMESTAMPTZ NOT NULL,
    actual_start_date  TIMESTAMPTZ,
    actual_end_date    TIMESTAMPTZ,
    status             VARCHAR(32) NOT NULL DEFAULT 'PLANNED',
    rag_status         VARCHAR(16) NOT NULL DEFAULT 'GREEN',
    lead_auditor       VARCHAR(255),
    auditee            VARCHAR(255),
    location           VARCHAR(255),
    audit_method       VARCHAR(32),
    effectiveness      INTEGER CHECK (effectiveness BETWEEN 1 AND 5),
    notes              TEXT,
    active             BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid         BIGINT,
    create_date        TIMESTAMPTZ DEFAULT NOW(),
    write_uid          BIGINT,
    write_date         TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_qms_audits_planned ON qms_audits (planned_start_date DESC);
CREATE INDEX IF NOT EXISTS idx_qms_audits_status ON qms_audits (status);

CREATE TABLE IF NOT EXISTS qms_audit_findings (
    id              BIGSERIAL PRIMARY KEY,
    audit_id        BIGINT NOT NULL REFERENCES qms_audits(id) ON DELETE CASCADE,
    finding_type    VARCHAR(32) NOT NULL,
    clause          VARCHAR(64),
    description     TEXT NOT NULL,
    status          VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_audit_logs (
    id              BIGSERIAL PRIMARY KEY,
    audit_id        BIGINT NOT NULL REFERENCES qms_audits(id) ON DELETE CASCADE,
    action          VARCHAR(64) NOT NULL,
    performed_by    BIGINT,
    comments        TEXT,
    logged_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- ================================================================
-- Non-conformance & actions
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_actions (
    id              BIGSERIAL PRIMARY KEY,
    action_type     VARCHAR(32) NOT NULL,
    title           VARCHAR(512) NOT NULL,
    details         TEXT,
    owner           VARCHAR(255) NOT NULL,
    due_date        TIMESTAMPTZ,
    status          VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_nonconformances (
    id                  BIGSERIAL PRIMARY KEY,
    ref_number          VARCHAR(32) NOT NULL UNIQUE,
    case_type           VARCHAR(32) NOT NULL,
    title               VARCHAR(255) NOT NULL,
    raised_by           VARCHAR(255) NOT NULL,
    process             VARCHAR(255),
    area                VARCHAR(255),
    department          VARCHAR(255),
    category            VARCHAR(255),
    severity            VARCHAR(16) NOT NULL DEFAULT 'MEDIUM',
    risk_impact         JSONB NOT NULL DEFAULT '[]',
    evidence            TEXT,
    problem_statement   TEXT NOT NULL,
    owner               VARCHAR(255) NOT NULL,
    approver            VARCHAR(255) NOT NULL,
    due_date            TIMESTAMPTZ,
    status              VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    date_raised         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    customer_name       VARCHAR(255),
    complaint_channel   VARCHAR(64),
    supplier_name       VARCHAR(255),
    po_reference        VARCHAR(64),
    request_8d          BOOLEAN NOT NULL DEFAULT FALSE,
    detection_point     VARCHAR(255),
    containment_needed  BOOLEAN NOT NULL DEFAULT FALSE,
    expected_benefit    TEXT,
    closed_date         TIMESTAMPTZ,
    closure_signature   TEXT,
    closure_approved_by VARCHAR(255),
    closure_approved_at TIMESTAMPTZ,
    closure_comments    TEXT,
    active              BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid          BIGINT,
    create_date         TIMESTAMPTZ DEFAULT NOW(),
    write_uid           BIGINT,
    write_date          TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_qms_nc_raised ON qms_nonconformances (date_raised DESC);
CREATE INDEX IF NOT EXISTS idx_qms_nc_status ON qms_nonconformances (status);

CREATE TABLE IF NOT EXISTS qms_nc_actions (
    id               BIGSERIAL PRIMARY KEY,
    nc_id            BIGINT NOT NULL REFERENCES qms_nonconformances(id) ON DELETE CASCADE,
    action_type      VARCHAR(32) NOT NULL,
    title            VARCHAR(255) NOT NULL,
    description      TEXT,
    owner            VARCHAR(255) NOT NULL,
    due_date         TIMESTAMPTZ,
    priority         VARCHAR(16) NOT NULL DEFAULT 'MEDIUM',
    status           VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    completed_date   TIMESTAMPTZ,
    global_action_id BIGINT REFERENCES qms_actions(id) ON DELETE SET NULL,
    active           BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid       BIGINT,
    create_date      TIMESTAMPTZ DEFAULT NOW(),
    write_uid        BIGINT,
    write_date       TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_qms_nc_actions_nc ON qms_nc_actions (nc_id);

CREATE TABLE IF NOT EXISTS qms_nc_logs (
    id              BIGSERIAL PRIMARY KEY,
    nc_id           BIGINT NOT NULL REFERENCES qms_nonconformances(id) ON DELETE CASCADE,
    event_type      VARCHAR(32) NOT NULL,
    description     TEXT NOT NULL,
    user_name       VARCHAR(255) NOT NULL,
    metadata        JSONB,
    logged_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- ================================================================
-- Waste management
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_waste_types (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    description     TEXT,
    category        VARCHAR(32) NOT NULL,
    hazard_class    VARCHAR(64),
    disposal_method VARCHAR(32),
    regulatory_code VARCHAR(64),
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_waste_records (
    id                BIGSERIAL PRIMARY KEY,
    record_number     VARCHAR(32) NOT NULL UNIQUE,
    waste_type_id     BIGINT NOT NULL REFERENCES qms_waste_types(id),
    quantity          DOUBLE PRECISION NOT NULL CHECK (quantity > 0),
    unit              VARCHAR(16) NOT NULL,
    location          VARCHAR(255) NOT NULL,
    generated_by      VARCHAR(255) NOT NULL,
    generated_date    TIMESTAMPTZ NOT NULL,
    stored_date       TIMESTAMPTZ,
    disposal_date     TIMESTAMPTZ,
    disposal_method   VARCHAR(32),
    disposal_facility VARCHAR(255),
    transporter       VARCHAR(255),
    manifest_number   VARCHAR(64),
    cost              DOUBLE PRECISION,
    status            VARCHAR(32) NOT NULL DEFAULT 'GENERATED',
    notes             TEXT,
    active            BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid        BIGINT,
    create_date       TIMESTAMPTZ DEFAULT NOW(),
    write_uid         BIGINT,
    write_date        TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_waste_record_logs (
    id              BIGSERIAL PRIMARY KEY,
    waste_record_id BIGINT NOT NULL REFERENCES qms_waste_records(id) ON DELETE CASCADE,
    action          VARCHAR(64) NOT NULL,
    performed_by    BIGINT,
    comments        TEXT,
    logged_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_waste_facilities (
    id                   BIGSERIAL PRIMARY KEY,
    name                 VARCHAR(255) NOT NULL,
    facility_type        VARCHAR(32) NOT NULL,
    address              TEXT,
    contact_person       VARCHAR(255),
    contact_phone        VARCHAR(64),
    contact_email        VARCHAR(255),
    license_number       VARCHAR(64),
    license_expiry       TIMESTAMPTZ,
    accepted_waste_types JSONB NOT NULL DEFAULT '[]',
    active               BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid           BIGINT,
    create_date          TIMESTAMPTZ DEFAULT NOW(),
    write_uid            BIGINT,
    write_date           TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_waste_transporters (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL,
    license_number  VARCHAR(64),
    contact_person  VARCHAR(255),
    contact_phone   VARCHAR(64),
    contact_email   VARCHAR(255),
    address         TEXT,
    license_expiry  TIMESTAMPTZ,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

-- ================================================================
-- Contract review
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_contract_reviews (
    id               BIGSERIAL PRIMARY KEY,
    contract_number  VARCHAR(64) NOT NULL UNIQUE,
    contract_title   VARCHAR(255) NOT NULL,
    contract_type    VARCHAR(32) NOT NULL,
    supplier_name    VARCHAR(255) NOT NULL,
    supplier_contact VARCHAR(255),
    supplier_email   VARCHAR(255),
    value            DOUBLE PRECISION,
    currency         VARCHAR(8) NOT NULL DEFAULT 'USD',
    start_date       TIMESTAMPTZ,
    end_date         TIMESTAMPTZ,
    renewal_date     TIMESTAMPTZ,
    status           VARCHAR(32) NOT NULL DEFAULT 'DRAFT',
    priority         VARCHAR(16) NOT NULL DEFAULT 'MEDIUM',
    risk_level       VARCHAR(16) NOT NULL DEFAULT 'MEDIUM',
    reviewer_id      BIGINT,
    reviewer_name    VARCHAR(255),
    review_date      TIMESTAMPTZ,
    approval_date    TIMESTAMPTZ,
    approver_name    VARCHAR(255),
    comments         TEXT,
    terms            TEXT,
    compliance_notes TEXT,
    next_review_date TIMESTAMPTZ,
    active           BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid       BIGINT,
    create_date      TIMESTAMPTZ DEFAULT NOW(),
    write_uid        BIGINT,
    write_date       TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_contract_review_logs (
    id              BIGSERIAL PRIMARY KEY,
    contract_id     BIGINT NOT NULL REFERENCES qms_contract_reviews(id) ON DELETE CASCADE,
    action          VARCHAR(64) NOT NULL,
    performed_by    VARCHAR(255),
    comments        TEXT,
    logged_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_contract_attachments (
    id              BIGSERIAL PRIMARY KEY,
    contract_id     BIGINT NOT NULL REFERENCES qms_contract_reviews(id) ON DELETE CASCADE,
    file_name       VARCHAR(255) NOT NULL,
    file_type       VARCHAR(64) NOT NULL,
    file_size       BIGINT,
    file_url        TEXT,
    uploaded_by     VARCHAR(255),
    uploaded_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    description     TEXT
);

-- ================================================================
-- Controlled documents
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_documents (
    id              BIGSERIAL PRIMARY KEY,
    code            VARCHAR(64) UNIQUE,
    title           VARCHAR(255) NOT NULL,
    doc_type        VARCHAR(32) NOT NULL,
    status          VARCHAR(32) NOT NULL DEFAULT 'DRAFT',
    version         VARCHAR(32) NOT NULL DEFAULT '1.0',
    owner           VARCHAR(255),
    next_review     TIMESTAMPTZ,
    iso_clauses     JSONB NOT NULL DEFAULT '[]',
    url             TEXT,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

-- ================================================================
-- Equipment & calibration
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_equipment (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL,
    asset_tag       VARCHAR(64) NOT NULL UNIQUE,
    location        VARCHAR(255),
    maint_due       TIMESTAMPTZ,
    status          VARCHAR(32) NOT NULL DEFAULT 'ACTIVE',
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_calibrations (
    id              BIGSERIAL PRIMARY KEY,
    equipment_id    BIGINT NOT NULL REFERENCES qms_equipment(id) ON DELETE CASCADE,
    due_date        TIMESTAMPTZ NOT NULL,
    performed_on    TIMESTAMPTZ,
    result          VARCHAR(32) NOT NULL DEFAULT 'NOT_TESTED',
    certificate_url TEXT,
    create_uid      BIGINT,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_uid       BIGINT,
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS qms_calibrations_equipment_due
    ON qms_calibrations (equipment_id, due_date DESC);

-- ================================================================
-- Management review
-- ================================================================

CREATE TABLE IF NOT EXISTS qms_management_reviews (
    id               BIGSERIAL PRIMARY KEY,
    title            VARCHAR(200) NOT NULL,
    status           VARCHAR(32) NOT NULL DEFAULT 'DRAFT',
    meeting_type     VARCHAR(32) NOT NULL,
    standards        JSONB NOT NULL DEFAULT '[]',
    agenda           TEXT,
    location         VARCHAR(255),
    scheduled_at     TIMESTAMPTZ NOT NULL,
    started_at       TIMESTAMPTZ,
    ended_at         TIMESTAMPTZ,
    discussion_notes TEXT,
    create_uid       BIGINT,
    create_date      TIMESTAMPTZ DEFAULT NOW(),
    write_uid        BIGINT,
    write_date       TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_review_attendees (
    id              BIGSERIAL PRIMARY KEY,
    review_id       BIGINT NOT NULL REFERENCES qms_management_reviews(id) ON DELETE CASCADE,
    name            VARCHAR(255) NOT NULL,
    role            VARCHAR(255),
    required        BOOLEAN NOT NULL DEFAULT FALSE,
    present         BOOLEAN NOT NULL DEFAULT FALSE,
    user_id         BIGINT,
    signed_off_at   TIMESTAMPTZ,
    signature       TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_review_inputs (
    id              BIGSERIAL PRIMARY KEY,
    review_id       BIGINT NOT NULL REFERENCES qms_management_reviews(id) ON DELETE CASCADE,
    standard        VARCHAR(16) NOT NULL,
    clause_ref      VARCHAR(32) NOT NULL,
    title           VARCHAR(255) NOT NULL,
    description     TEXT NOT NULL,
    data_source     VARCHAR(255),
    status          VARCHAR(32) NOT NULL DEFAULT 'PENDING',
    remarks         TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_review_outputs (
    id              BIGSERIAL PRIMARY KEY,
    review_id       BIGINT NOT NULL REFERENCES qms_management_reviews(id) ON DELETE CASCADE,
    standard        VARCHAR(16) NOT NULL,
    clause_ref      VARCHAR(32) NOT NULL,
    decision        TEXT NOT NULL,
    output_type     VARCHAR(32) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_review_actions (
    id              BIGSERIAL PRIMARY KEY,
    review_id       BIGINT NOT NULL REFERENCES qms_management_reviews(id) ON DELETE CASCADE,
    title           VARCHAR(255) NOT NULL,
    owner_id        BIGINT,
    due_date        TIMESTAMPTZ,
    status          VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    linkage         TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_review_evidence (
    id              BIGSERIAL PRIMARY KEY,
    review_id       BIGINT NOT NULL REFERENCES qms_management_reviews(id) ON DELETE CASCADE,
    label           VARCHAR(255) NOT NULL,
    url             TEXT NOT NULL,
    uploaded_by     BIGINT,
    uploaded_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS qms_review_logs (
    id              BIGSERIAL PRIMARY KEY,
    review_id       BIGINT NOT NULL REFERENCES qms_management_reviews(id) ON DELETE CASCADE,
    actor_id        BIGINT,
    event           VARCHAR(32) NOT NULL,
    details         TEXT,
    logged_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// Run the QMS migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("QMS migration failed: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::MIGRATION_SQL;

    #[test]
    fn every_schema_table_is_created() {
        let tables = [
            "qms_users",
            "qms_courses",
            "qms_training_records",
            "qms_risks",
            "qms_hazards",
            "qms_incidents",
            "qms_audit_types",
            "qms_audits",
            "qms_audit_findings",
            "qms_audit_logs",
            "qms_nonconformances",
            "qms_nc_actions",
            "qms_nc_logs",
            "qms_actions",
            "qms_waste_types",
            "qms_waste_records",
            "qms_waste_record_logs",
            "qms_waste_facilities",
            "qms_waste_transporters",
            "qms_contract_reviews",
            "qms_contract_review_logs",
            "qms_contract_attachments",
            "qms_documents",
            "qms_equipment",
            "qms_calibrations",
            "qms_management_reviews",
            "qms_review_attendees",
            "qms_review_inputs",
            "qms_review_outputs",
            "qms_review_actions",
            "qms_review_evidence",
            "qms_review_logs",
        ];
        for table in tables {
            let stmt = format!("CREATE TABLE IF NOT EXISTS {table} (");
            assert!(MIGRATION_SQL.contains(&stmt), "missing table {table}");
        }
    }

    #[test]
    fn qms_actions_precedes_nc_actions_foreign_key() {
        let actions = MIGRATION_SQL.find("CREATE TABLE IF NOT EXISTS qms_actions").unwrap();
        let nc_actions = MIGRATION_SQL.find("CREATE TABLE IF NOT EXISTS qms_nc_actions").unwrap();
        assert!(actions < nc_actions);
    }
}
