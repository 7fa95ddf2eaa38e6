//! Demo data: audit types, courses, waste types, a facility, a transporter,
//! controlled documents, a starter risk register and the equipment
//! register with its calibration schedule.
//!
//! Idempotent. Tables with a natural key use ON CONFLICT DO NOTHING; the
//! rest are only filled when empty.

use diesel::sql_types::{BigInt, Integer, Nullable, Text};
use diesel::QueryableByName;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

async fn count(conn: &mut AsyncPgConnection, table: &str) -> anyhow::Result<i64> {
    let row: Count = diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {table}"))
        .get_result(conn)
        .await?;
    Ok(row.count)
}

/// True once the audit type catalogue exists.
pub async fn is_seeded(conn: &mut AsyncPgConnection) -> anyhow::Result<bool> {
    Ok(count(conn, "qms_audit_types").await? > 0)
}

const AUDIT_TYPES: &[(&str, &str, &str, &str)] = &[
    ("Internal Quality Audit", "INTERNAL", "ANNUAL", "ISO 9001"),
    ("Internal Environmental Audit", "INTERNAL", "ANNUAL", "ISO 14001"),
    ("Internal OH&S Audit", "INTERNAL", "ANNUAL", "ISO 45001"),
    ("Process Audit", "INTERNAL", "QUARTERLY", "ISO 9001"),
    ("Compliance Audit", "INTERNAL", "BI_ANNUAL", "ISO 14001"),
    ("Certification Audit", "EXTERNAL", "ANNUAL", "ISO 9001"),
    ("Surveillance Audit", "EXTERNAL", "ANNUAL", "ISO 9001"),
    ("Supplier Audit", "SUPPLIER", "AD_HOC", "ISO 9001"),
];

const COURSES: &[(&str, &str, Option<i32>)] = &[
    ("TRN-001", "ISO 9001 Awareness", Some(36)),
    ("TRN-002", "ISO 14001 Awareness", Some(36)),
    ("TRN-003", "Internal Auditor Training", Some(24)),
    ("TRN-004", "Risk Assessment Training", Some(24)),
    ("TRN-005", "Document Control Training", None),
    ("TRN-006", "Environmental Aspects Training", Some(24)),
    ("TRN-007", "Calibration Training", Some(12)),
    ("TRN-008", "Health & Safety Induction", Some(12)),
];

const WASTE_TYPES: &[(&str, &str, Option<&str>, &str)] = &[
    ("Used Oil", "HAZARDOUS", Some("Class 3 - Flammable Liquids"), "RECYCLING"),
    ("Paper Waste", "RECYCLABLE", None, "RECYCLING"),
    ("Electronic Waste", "ELECTRONIC", None, "RECYCLING"),
    ("Food Waste", "ORGANIC", None, "COMPOSTING"),
    ("Paint Waste", "HAZARDOUS", Some("Class 3 - Flammable Liquids"), "TREATMENT"),
];

/// (code, title, type, version, owner, next review, ISO clauses)
const DOCUMENTS: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    ("POL-001", "Quality Policy", "POLICY", "2.0", "Admin User", "2025-12-31", r#"["9001:5.2","9001:5.3"]"#),
    ("POL-002", "Environmental Policy", "POLICY", "1.5", "Admin User", "2025-11-30", r#"["14001:5.2","14001:5.3"]"#),
    ("POL-003", "Health & Safety Policy", "POLICY", "1.0", "Sarah Jones", "2026-01-15", r#"["45001:5.2"]"#),
    ("PROC-001", "Document Control Procedure", "PROCEDURE", "3.0", "John Smith", "2025-10-31", r#"["9001:7.5","14001:7.5"]"#),
    ("PROC-002", "Internal Audit Procedure", "PROCEDURE", "2.1", "Mike Brown", "2025-09-30", r#"["9001:9.2","14001:9.2"]"#),
    ("PROC-003", "Corrective Action Procedure", "PROCEDURE", "1.8", "Emma Wilson", "2025-12-15", r#"["9001:10.2","14001:10.2"]"#),
    ("WI-001", "Calibration Work Instruction", "WORK_INSTRUCTION", "1.2", "David Taylor", "2026-03-01", r#"["9001:7.1.5"]"#),
    ("WI-002", "Waste Segregation WI", "WORK_INSTRUCTION", "1.0", "Sarah Jones", "2025-11-01", r#"["14001:8.1"]"#),
    ("REG-001", "Risk & Opportunity Register", "REGISTER", "1.0", "Admin User", "2026-06-30", r#"["9001:6.1"]"#),
    ("REG-002", "Legal & Compliance Register", "REGISTER", "1.0", "Mike Brown", "2026-06-30", r#"["14001:6.1.3"]"#),
];

/// (title, context, category, likelihood, severity, owner, status)
const RISKS: &[(&str, &str, &str, i32, i32, &str, &str)] = &[
    ("Supply Chain Disruption", "Raw material procurement", "OPERATIONAL", 3, 4, "John Smith", "TREATED"),
    ("Equipment Failure", "Production machinery", "OPERATIONAL", 2, 5, "David Taylor", "OPEN"),
    ("Data Breach", "IT systems and customer data", "INFORMATION", 2, 5, "Mike Brown", "TREATED"),
    ("Hazardous Waste Spill", "Chemical storage area", "ENVIRONMENTAL", 2, 4, "Sarah Jones", "TREATED"),
    ("Regulatory Non-Compliance", "Environmental permits", "COMPLIANCE", 1, 5, "Mike Brown", "TREATED"),
    ("Staff Turnover", "Key personnel retention", "PEOPLE", 3, 3, "Emma Wilson", "OPEN"),
    ("Customer Complaint Escalation", "Product quality issues", "QUALITY", 2, 3, "John Smith", "OPEN"),
    ("Energy Cost Increase", "Operational expenses", "FINANCIAL", 4, 2, "Sarah Jones", "OPEN"),
    ("Calibration Lapse", "Measurement equipment", "QUALITY", 1, 4, "David Taylor", "TREATED"),
    ("Air Emissions Exceedance", "Manufacturing processes", "ENVIRONMENTAL", 1, 5, "Sarah Jones", "TREATED"),
    ("Document Control Failure", "Obsolete documents in use", "QUALITY", 2, 2, "John Smith", "OPEN"),
    ("Audit Finding Recurrence", "Internal audit process", "QUALITY", 3, 2, "Mike Brown", "OPEN"),
];

/// (asset tag, name, location, maintenance due, status)
const EQUIPMENT: &[(&str, &str, &str, &str, &str)] = &[
    ("CAL-001", "Digital Caliper", "QC Lab", "2025-12-31", "ACTIVE"),
    ("PG-002", "Pressure Gauge", "Production Floor", "2025-11-15", "ACTIVE"),
    ("TP-003", "Temperature Sensor", "Cold Storage", "2025-10-31", "ACTIVE"),
    ("WS-004", "Weighing Scale", "Warehouse", "2026-01-15", "ACTIVE"),
    ("TW-005", "Torque Wrench", "Maintenance Shop", "2025-12-01", "ACTIVE"),
    ("PH-006", "pH Meter", "QC Lab", "2025-11-30", "ACTIVE"),
    ("MIC-007", "Micrometer", "QC Lab", "2026-02-28", "ACTIVE"),
    ("GD-008", "Gas Detector", "Chemical Storage", "2025-10-15", "ACTIVE"),
    ("MM-009", "Multimeter", "Electrical Room", "2025-09-30", "OUT_OF_SERVICE"),
    ("FM-010", "Flow Meter", "Process Line 1", "2026-01-31", "ACTIVE"),
];

/// Insert the demo catalogue and registers.
pub async fn seed(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    // ── 1. Audit types ──
    for (name, category, frequency, standard) in AUDIT_TYPES {
        diesel::sql_query(
            "INSERT INTO qms_audit_types (name, category, frequency, standard) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (name) DO NOTHING",
        )
        .bind::<Text, _>(*name)
        .bind::<Text, _>(*category)
        .bind::<Text, _>(*frequency)
        .bind::<Text, _>(*standard)
        .execute(conn)
        .await?;
    }

    // ── 2. Courses ──
    for (code, title, validity) in COURSES {
        diesel::sql_query(
            "INSERT INTO qms_courses (code, title, validity_months) \
             VALUES ($1, $2, $3) ON CONFLICT (code) DO NOTHING",
        )
        .bind::<Text, _>(*code)
        .bind::<Text, _>(*title)
        .bind::<Nullable<Integer>, _>(*validity)
        .execute(conn)
        .await?;
    }

    // ── 3. Waste types ──
    for (name, category, hazard_class, disposal) in WASTE_TYPES {
        diesel::sql_query(
            "INSERT INTO qms_waste_types (name, category, hazard_class, disposal_method) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (name) DO NOTHING",
        )
        .bind::<Text, _>(*name)
        .bind::<Text, _>(*category)
        .bind::<Nullable<Text>, _>(*hazard_class)
        .bind::<Text, _>(*disposal)
        .execute(conn)
        .await?;
    }

    // ── 4. Facility and transporter ──
    if count(conn, "qms_waste_facilities").await? == 0 {
        diesel::sql_query(
            "INSERT INTO qms_waste_facilities \
             (name, facility_type, license_number, license_expiry, accepted_waste_types) \
             VALUES ('EcoRecycle Center', 'RECYCLING', 'RC-2024-002', NOW() + INTERVAL '1 year', \
                     '[\"RECYCLABLE\", \"ELECTRONIC\"]')",
        )
        .execute(conn)
        .await?;
    }
    if count(conn, "qms_waste_transporters").await? == 0 {
        diesel::sql_query(
            "INSERT INTO qms_waste_transporters (name, license_number, license_expiry) \
             VALUES ('ABC Waste Transport', 'WT-2024-001', NOW() + INTERVAL '1 year')",
        )
        .execute(conn)
        .await?;
    }

    // ── 5. Documents ──
    for (code, title, doc_type, version, owner, next_review, clauses) in DOCUMENTS {
        diesel::sql_query(
            "INSERT INTO qms_documents \
             (code, title, doc_type, status, version, owner, next_review, iso_clauses) \
             VALUES ($1, $2, $3, 'APPROVED', $4, $5, $6::date, $7::jsonb) \
             ON CONFLICT (code) DO NOTHING",
        )
        .bind::<Text, _>(*code)
        .bind::<Text, _>(*title)
        .bind::<Text, _>(*doc_type)
        .bind::<Text, _>(*version)
        .bind::<Text, _>(*owner)
        .bind::<Text, _>(*next_review)
        .bind::<Text, _>(*clauses)
        .execute(conn)
        .await?;
    }

    // ── 6. Risk register ──
    if count(conn, "qms_risks").await? == 0 {
        for (title, context, category, likelihood, severity, owner, status) in RISKS {
            diesel::sql_query(
                "INSERT INTO qms_risks \
                 (title, context, category, likelihood, severity, owner, status, review_date) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, NOW() + INTERVAL '6 months')",
            )
            .bind::<Text, _>(*title)
            .bind::<Text, _>(*context)
            .bind::<Text, _>(*category)
            .bind::<Integer, _>(*likelihood)
            .bind::<Integer, _>(*severity)
            .bind::<Text, _>(*owner)
            .bind::<Text, _>(*status)
            .execute(conn)
            .await?;
        }
    }

    // ── 7. Equipment and calibrations ──
    for (asset_tag, name, location, maint_due, status) in EQUIPMENT {
        diesel::sql_query(
            "INSERT INTO qms_equipment (asset_tag, name, location, maint_due, status) \
             VALUES ($1, $2, $3, $4::date, $5) ON CONFLICT (asset_tag) DO NOTHING",
        )
        .bind::<Text, _>(*asset_tag)
        .bind::<Text, _>(*name)
        .bind::<Text, _>(*location)
        .bind::<Text, _>(*maint_due)
        .bind::<Text, _>(*status)
        .execute(conn)
        .await?;
    }
    if count(conn, "qms_calibrations").await? == 0 {
        // Last year's passed calibration plus the next one, 30 to 120 days out.
        diesel::sql_query(
            "INSERT INTO qms_calibrations (equipment_id, due_date, performed_on, result, certificate_url) \
             SELECT id, NOW() - INTERVAL '365 days', NOW() - INTERVAL '370 days', 'PASS', \
                    '/certs/cal-cert-' || asset_tag || '.pdf' \
             FROM qms_equipment",
        )
        .execute(conn)
        .await?;
        diesel::sql_query(
            "INSERT INTO qms_calibrations (equipment_id, due_date) \
             SELECT id, NOW() + (30 + (id * 37) % 90) * INTERVAL '1 day' FROM qms_equipment",
        )
        .execute(conn)
        .await?;
    }

    tracing::info!(
        audit_types = AUDIT_TYPES.len(),
        courses = COURSES.len(),
        waste_types = WASTE_TYPES.len(),
        documents = DOCUMENTS.len(),
        risks = RISKS.len(),
        equipment = EQUIPMENT.len(),
        "Demo data seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::iso;
    use crate::compliance::risk;
    use crate::models::vocab::EquipmentStatus;

    #[test]
    fn seed_documents_use_known_clauses() {
        for (code, _, _, _, _, _, clauses) in DOCUMENTS {
            let refs: serde_json::Value = serde_json::from_str(clauses).unwrap();
            let parsed = iso::iso_clauses(&refs);
            assert_eq!(parsed.len(), refs.as_array().unwrap().len(), "{code}");
            assert!(parsed.iter().all(|c| c.title != "Unknown"), "{code}");
        }
    }

    #[test]
    fn seed_equipment_has_unique_tags_and_known_status() {
        let mut tags = std::collections::HashSet::new();
        for (tag, _, _, maint_due, status) in EQUIPMENT {
            assert!(tags.insert(*tag), "{tag}");
            assert!(status.parse::<EquipmentStatus>().is_ok(), "{tag}");
            assert!(maint_due.parse::<chrono::NaiveDate>().is_ok(), "{tag}");
        }
    }

    #[test]
    fn seed_risks_are_on_the_scale() {
        for (title, _, _, likelihood, severity, _, _) in RISKS {
            assert!(risk::in_scale(*likelihood) && risk::in_scale(*severity), "{title}");
        }
    }
}
