//! Diesel table definitions for the QMS.
//!
//! Tables are grouped by feature area: users and training, risk and OH&S,
//! audits, non-conformance, waste management, contract review, documents.
//! Every business table carries `active` plus create/write bookkeeping.

diesel::table! {
    qms_users (id) {
        id -> Int8,
        email -> Varchar,
        name -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_courses (id) {
        id -> Int8,
        code -> Varchar,
        title -> Varchar,
        description -> Nullable<Text>,
        validity_months -> Nullable<Int4>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_training_records (id) {
        id -> Int8,
        user_id -> Int8,
        course_id -> Int8,
        status -> Varchar,
        due_date -> Nullable<Timestamptz>,
        completed -> Nullable<Timestamptz>,
        score -> Nullable<Int4>,
        document_url -> Nullable<Text>,
        document_name -> Nullable<Varchar>,
        notes -> Nullable<Text>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_risks (id) {
        id -> Int8,
        title -> Varchar,
        context -> Nullable<Text>,
        category -> Varchar,
        likelihood -> Int4,
        severity -> Int4,
        controls -> Jsonb,
        owner -> Nullable<Varchar>,
        review_date -> Nullable<Timestamptz>,
        status -> Varchar,
        iso_refs -> Jsonb,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_hazards (id) {
        id -> Int8,
        title -> Varchar,
        area -> Nullable<Varchar>,
        description -> Nullable<Text>,
        likelihood -> Int4,
        severity -> Int4,
        residual_l -> Nullable<Int4>,
        residual_s -> Nullable<Int4>,
        controls -> Jsonb,
        owner -> Nullable<Varchar>,
        review_date -> Nullable<Timestamptz>,
        status -> Varchar,
        iso_refs -> Jsonb,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_incidents (id) {
        id -> Int8,
        ref_number -> Nullable<Varchar>,
        incident_type -> Varchar,
        occurred_at -> Timestamptz,
        location -> Nullable<Varchar>,
        description -> Nullable<Text>,
        people -> Jsonb,
        severity_type -> Varchar,
        lost_time_days -> Nullable<Int4>,
        hours_worked -> Nullable<Float8>,
        immediate_actions -> Nullable<Text>,
        status -> Varchar,
        iso_refs -> Jsonb,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_audit_types (id) {
        id -> Int8,
        name -> Varchar,
        description -> Nullable<Text>,
        category -> Varchar,
        frequency -> Varchar,
        standard -> Nullable<Varchar>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_audits (id) {
        id -> Int8,
        audit_number -> Varchar,
        audit_type_id -> Int8,
        title -> Varchar,
        description -> Nullable<Text>,
        scope -> Text,
        objectives -> Nullable<Text>,
        audit_standard -> Varchar,
        audit_criteria -> Nullable<Text>,
        planned_start_date -> Timestamptz,
        planned_end_date -> Timestamptz,
        actual_start_date -> Nullable<Timestamptz>,
        actual_end_date -> Nullable<Timestamptz>,
        status -> Varchar,
        rag_status -> Varchar,
        lead_auditor -> Nullable<Varchar>,
        auditee -> Nullable<Varchar>,
        location -> Nullable<Varchar>,
        audit_method -> Nullable<Varchar>,
        effectiveness -> Nullable<Int4>,
        notes -> Nullable<Text>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_audit_findings (id) {
        id -> Int8,
        audit_id -> Int8,
        finding_type -> Varchar,
        clause -> Nullable<Varchar>,
        description -> Text,
        status -> Varchar,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_audit_logs (id) {
        id -> Int8,
        audit_id -> Int8,
        action -> Varchar,
        performed_by -> Nullable<Int8>,
        comments -> Nullable<Text>,
        logged_at -> Timestamptz,
    }
}

diesel::table! {
    qms_nonconformances (id) {
        id -> Int8,
        ref_number -> Varchar,
        case_type -> Varchar,
        title -> Varchar,
        raised_by -> Varchar,
        process -> Nullable<Varchar>,
        area -> Nullable<Varchar>,
        department -> Nullable<Varchar>,
        category -> Nullable<Varchar>,
        severity -> Varchar,
        risk_impact -> Jsonb,
        evidence -> Nullable<Text>,
        problem_statement -> Text,
        owner -> Varchar,
        approver -> Varchar,
        due_date -> Nullable<Timestamptz>,
        status -> Varchar,
        date_raised -> Timestamptz,
        customer_name -> Nullable<Varchar>,
        complaint_channel -> Nullable<Varchar>,
        supplier_name -> Nullable<Varchar>,
        po_reference -> Nullable<Varchar>,
        request_8d -> Bool,
        detection_point -> Nullable<Varchar>,
        containment_needed -> Bool,
        expected_benefit -> Nullable<Text>,
        closed_date -> Nullable<Timestamptz>,
        closure_signature -> Nullable<Text>,
        closure_approved_by -> Nullable<Varchar>,
        closure_approved_at -> Nullable<Timestamptz>,
        closure_comments -> Nullable<Text>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_nc_actions (id) {
        id -> Int8,
        nc_id -> Int8,
        action_type -> Varchar,
        title -> Varchar,
        description -> Nullable<Text>,
        owner -> Varchar,
        due_date -> Nullable<Timestamptz>,
        priority -> Varchar,
        status -> Varchar,
        completed_date -> Nullable<Timestamptz>,
        global_action_id -> Nullable<Int8>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_nc_logs (id) {
        id -> Int8,
        nc_id -> Int8,
        event_type -> Varchar,
        description -> Text,
        user_name -> Varchar,
        metadata -> Nullable<Jsonb>,
        logged_at -> Timestamptz,
    }
}

diesel::table! {
    qms_actions (id) {
        id -> Int8,
        action_type -> Varchar,
        title -> Varchar,
        details -> Nullable<Text>,
        owner -> Varchar,
        due_date -> Nullable<Timestamptz>,
        status -> Varchar,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_waste_types (id) {
        id -> Int8,
        name -> Varchar,
        description -> Nullable<Text>,
        category -> Varchar,
        hazard_class -> Nullable<Varchar>,
        disposal_method -> Nullable<Varchar>,
        regulatory_code -> Nullable<Varchar>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_waste_records (id) {
        id -> Int8,
        record_number -> Varchar,
        waste_type_id -> Int8,
        quantity -> Float8,
        unit -> Varchar,
        location -> Varchar,
        generated_by -> Varchar,
        generated_date -> Timestamptz,
        stored_date -> Nullable<Timestamptz>,
        disposal_date -> Nullable<Timestamptz>,
        disposal_method -> Nullable<Varchar>,
        disposal_facility -> Nullable<Varchar>,
        transporter -> Nullable<Varchar>,
        manifest_number -> Nullable<Varchar>,
        cost -> Nullable<Float8>,
        status -> Varchar,
        notes -> Nullable<Text>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_waste_record_logs (id) {
        id -> Int8,
        waste_record_id -> Int8,
        action -> Varchar,
        performed_by -> Nullable<Int8>,
        comments -> Nullable<Text>,
        logged_at -> Timestamptz,
    }
}

diesel::table! {
    qms_waste_facilities (id) {
        id -> Int8,
        name -> Varchar,
        facility_type -> Varchar,
        address -> Nullable<Text>,
        contact_person -> Nullable<Varchar>,
        contact_phone -> Nullable<Varchar>,
        contact_email -> Nullable<Varchar>,
        license_number -> Nullable<Varchar>,
        license_expiry -> Nullable<Timestamptz>,
        accepted_waste_types -> Jsonb,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_waste_transporters (id) {
        id -> Int8,
        name -> Varchar,
        license_number -> Nullable<Varchar>,
        contact_person -> Nullable<Varchar>,
        contact_phone -> Nullable<Varchar>,
        contact_email -> Nullable<Varchar>,
        address -> Nullable<Text>,
        license_expiry -> Nullable<Timestamptz>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_contract_reviews (id) {
        id -> Int8,
        contract_number -> Varchar,
        contract_title -> Varchar,
        contract_type -> Varchar,
        supplier_name -> Varchar,
        supplier_contact -> Nullable<Varchar>,
        supplier_email -> Nullable<Varchar>,
        value -> Nullable<Float8>,
        currency -> Varchar,
        start_date -> Nullable<Timestamptz>,
        end_date -> Nullable<Timestamptz>,
        renewal_date -> Nullable<Timestamptz>,
        status -> Varchar,
        priority -> Varchar,
        risk_level -> Varchar,
        reviewer_id -> Nullable<Int8>,
        reviewer_name -> Nullable<Varchar>,
        review_date -> Nullable<Timestamptz>,
        approval_date -> Nullable<Timestamptz>,
        approver_name -> Nullable<Varchar>,
        comments -> Nullable<Text>,
        terms -> Nullable<Text>,
        compliance_notes -> Nullable<Text>,
        next_review_date -> Nullable<Timestamptz>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_contract_review_logs (id) {
        id -> Int8,
        contract_id -> Int8,
        action -> Varchar,
        performed_by -> Nullable<Varchar>,
        comments -> Nullable<Text>,
        logged_at -> Timestamptz,
    }
}

diesel::table! {
    qms_contract_attachments (id) {
        id -> Int8,
        contract_id -> Int8,
        file_name -> Varchar,
        file_type -> Varchar,
        file_size -> Nullable<Int8>,
        file_url -> Nullable<Text>,
        uploaded_by -> Nullable<Varchar>,
        uploaded_at -> Timestamptz,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    qms_documents (id) {
        id -> Int8,
        code -> Nullable<Varchar>,
        title -> Varchar,
        doc_type -> Varchar,
        status -> Varchar,
        version -> Varchar,
        owner -> Nullable<Varchar>,
        next_review -> Nullable<Timestamptz>,
        iso_clauses -> Jsonb,
        url -> Nullable<Text>,
        active -> Bool,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_equipment (id) {
        id -> Int8,
        name -> Varchar,
        asset_tag -> Varchar,
        location -> Nullable<Varchar>,
        maint_due -> Nullable<Timestamptz>,
        status -> Varchar,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_calibrations (id) {
        id -> Int8,
        equipment_id -> Int8,
        due_date -> Timestamptz,
        performed_on -> Nullable<Timestamptz>,
        result -> Varchar,
        certificate_url -> Nullable<Text>,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_management_reviews (id) {
        id -> Int8,
        title -> Varchar,
        status -> Varchar,
        meeting_type -> Varchar,
        standards -> Jsonb,
        agenda -> Nullable<Text>,
        location -> Nullable<Varchar>,
        scheduled_at -> Timestamptz,
        started_at -> Nullable<Timestamptz>,
        ended_at -> Nullable<Timestamptz>,
        discussion_notes -> Nullable<Text>,
        create_uid -> Nullable<Int8>,
        create_date -> Nullable<Timestamptz>,
        write_uid -> Nullable<Int8>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    qms_review_attendees (id) {
        id -> Int8,
        review_id -> Int8,
        name -> Varchar,
        role -> Nullable<Varchar>,
        required -> Bool,
        present -> Bool,
        user_id -> Nullable<Int8>,
        signed_off_at -> Nullable<Timestamptz>,
        signature -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    qms_review_inputs (id) {
        id -> Int8,
        review_id -> Int8,
        standard -> Varchar,
        clause_ref -> Varchar,
        title -> Varchar,
        description -> Text,
        data_source -> Nullable<Varchar>,
        status -> Varchar,
        remarks -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    qms_review_outputs (id) {
        id -> Int8,
        review_id -> Int8,
        standard -> Varchar,
        clause_ref -> Varchar,
        decision -> Text,
        output_type -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    qms_review_actions (id) {
        id -> Int8,
        review_id -> Int8,
        title -> Varchar,
        owner_id -> Nullable<Int8>,
        due_date -> Nullable<Timestamptz>,
        status -> Varchar,
        linkage -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    qms_review_evidence (id) {
        id -> Int8,
        review_id -> Int8,
        label -> Varchar,
        url -> Text,
        uploaded_by -> Nullable<Int8>,
        uploaded_at -> Timestamptz,
    }
}

diesel::table! {
    qms_review_logs (id) {
        id -> Int8,
        review_id -> Int8,
        actor_id -> Nullable<Int8>,
        event -> Varchar,
        details -> Nullable<Text>,
        logged_at -> Timestamptz,
    }
}

diesel::joinable!(qms_training_records -> qms_users (user_id));
diesel::joinable!(qms_training_records -> qms_courses (course_id));
diesel::joinable!(qms_audits -> qms_audit_types (audit_type_id));
diesel::joinable!(qms_audit_findings -> qms_audits (audit_id));
diesel::joinable!(qms_audit_logs -> qms_audits (audit_id));
diesel::joinable!(qms_nc_actions -> qms_nonconformances (nc_id));
diesel::joinable!(qms_nc_logs -> qms_nonconformances (nc_id));
diesel::joinable!(qms_waste_records -> qms_waste_types (waste_type_id));
diesel::joinable!(qms_waste_record_logs -> qms_waste_records (waste_record_id));
diesel::joinable!(qms_contract_review_logs -> qms_contract_reviews (contract_id));
diesel::joinable!(qms_contract_attachments -> qms_contract_reviews (contract_id));
diesel::joinable!(qms_calibrations -> qms_equipment (equipment_id));
diesel::joinable!(qms_review_attendees -> qms_management_reviews (review_id));
diesel::joinable!(qms_review_inputs -> qms_management_reviews (review_id));
diesel::joinable!(qms_review_outputs -> qms_management_reviews (review_id));
diesel::joinable!(qms_review_actions -> qms_management_reviews (review_id));
diesel::joinable!(qms_review_evidence -> qms_management_reviews (review_id));
diesel::joinable!(qms_review_logs -> qms_management_reviews (review_id));

diesel::allow_tables_to_appear_in_same_query!(
    qms_users,
    qms_courses,
    qms_training_records,
    qms_risks,
    qms_hazards,
    qms_incidents,
    qms_audit_types,
    qms_audits,
    qms_audit_findings,
    qms_audit_logs,
    qms_nonconformances,
    qms_nc_actions,
    qms_nc_logs,
    qms_actions,
    qms_waste_types,
    qms_waste_records,
    qms_waste_record_logs,
    qms_waste_facilities,
    qms_waste_transporters,
    qms_contract_reviews,
    qms_contract_review_logs,
    qms_contract_attachments,
    qms_documents,
    qms_equipment,
    qms_calibrations,
    qms_management_reviews,
    qms_review_attendees,
    qms_review_inputs,
    qms_review_outputs,
    qms_review_actions,
    qms_review_evidence,
    qms_review_logs,
);
