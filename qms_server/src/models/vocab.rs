//! Enumerated status and category values stored as VARCHAR.

use chrono::Duration;

string_enum!(AuditStatus {
    Planned => "PLANNED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    Deferred => "DEFERRED",
});

string_enum!(AuditRag {
    Green => "GREEN",
    Amber => "AMBER",
    Red => "RED",
});

string_enum!(AuditMethod {
    OnSite => "ON_SITE",
    Remote => "REMOTE",
    Hybrid => "HYBRID",
});

string_enum!(AuditCategory {
    Internal => "INTERNAL",
    External => "EXTERNAL",
    Supplier => "SUPPLIER",
    Customer => "CUSTOMER",
    Regulatory => "REGULATORY",
});

string_enum!(AuditFrequency {
    Annual => "ANNUAL",
    BiAnnual => "BI_ANNUAL",
    Quarterly => "QUARTERLY",
    Monthly => "MONTHLY",
    AdHoc => "AD_HOC",
});

string_enum!(FindingType {
    MajorNc => "MAJOR_NC",
    MinorNc => "MINOR_NC",
    Observation => "OBSERVATION",
    Opportunity => "OPPORTUNITY",
});

string_enum!(FindingStatus {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    Closed => "CLOSED",
});

string_enum!(
    /// Lifecycle of risks and hazards.
    RiskStatus {
        Open => "OPEN",
        Treated => "TREATED",
        Closed => "CLOSED",
    }
);

string_enum!(IncidentType {
    Injury => "INJURY",
    NearMiss => "NEAR_MISS",
    DangerousOccurrence => "DANGEROUS_OCCURRENCE",
    Environmental => "ENVIRONMENTAL",
    PropertyDamage => "PROPERTY_DAMAGE",
});

string_enum!(IncidentSeverity {
    FirstAid => "FIRST_AID",
    MedicalTreatment => "MEDICAL_TREATMENT",
    LostTime => "LOST_TIME",
    Fatality => "FATALITY",
    None => "NONE",
});

string_enum!(IncidentStatus {
    Open => "OPEN",
    Investigating => "INVESTIGATING",
    Closed => "CLOSED",
});

string_enum!(TrainingStatus {
    NotStarted => "NOT_STARTED",
    InProgress => "IN_PROGRESS",
    Complete => "COMPLETE",
    Expired => "EXPIRED",
});

string_enum!(
    /// Kind of improvement case; also the reference prefix.
    CaseType {
        Nc => "NC",
        Complaint => "COMPLAINT",
        Supplier => "SUPPLIER",
        Improvement => "IMPROVEMENT",
    }
);

string_enum!(NcSeverity {
    Critical => "CRITICAL",
    High => "HIGH",
    Medium => "MEDIUM",
    Low => "LOW",
});

impl NcSeverity {
    /// Time allowed to resolve a case of this severity.
    pub fn response_window(self) -> Duration {
        match self {
            NcSeverity::Critical => Duration::days(5),
            NcSeverity::High => Duration::days(10),
            NcSeverity::Medium => Duration::days(15),
            NcSeverity::Low => Duration::days(20),
        }
    }
}

string_enum!(NcStatus {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    PendingVerification => "PENDING_VERIFICATION",
    Closed => "CLOSED",
});

string_enum!(NcActionType {
    Containment => "CONTAINMENT",
    Corrective => "CORRECTIVE",
    Preventive => "PREVENTIVE",
});

string_enum!(NcActionStatus {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    Done => "DONE",
});

string_enum!(
    /// Status of an entry in the organisation-wide action register.
    ActionStatus {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
    }
);

impl From<NcActionStatus> for ActionStatus {
    fn from(status: NcActionStatus) -> Self {
        match status {
            NcActionStatus::Done => ActionStatus::Completed,
            NcActionStatus::InProgress => ActionStatus::InProgress,
            NcActionStatus::Open => ActionStatus::Open,
        }
    }
}

string_enum!(
    /// Shared four-level scale for priorities and risk levels.
    Level {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
);

string_enum!(WasteCategory {
    Hazardous => "HAZARDOUS",
    NonHazardous => "NON_HAZARDOUS",
    Recyclable => "RECYCLABLE",
    Organic => "ORGANIC",
    Electronic => "ELECTRONIC",
});

string_enum!(
    /// Disposal route; also the kind of a waste facility.
    DisposalMethod {
        Landfill => "LANDFILL",
        Incineration => "INCINERATION",
        Recycling => "RECYCLING",
        Composting => "COMPOSTING",
        Treatment => "TREATMENT",
    }
);

string_enum!(WasteUnit {
    Kg => "KG",
    Liters => "LITERS",
    CubicMeters => "CUBIC_METERS",
    Pieces => "PIECES",
});

string_enum!(WasteStatus {
    Generated => "GENERATED",
    Stored => "STORED",
    InTransit => "IN_TRANSIT",
    Disposed => "DISPOSED",
});

string_enum!(ContractType {
    Supply => "SUPPLY",
    Service => "SERVICE",
    Consulting => "CONSULTING",
    Maintenance => "MAINTENANCE",
    Other => "OTHER",
});

string_enum!(ContractStatus {
    Draft => "DRAFT",
    UnderReview => "UNDER_REVIEW",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Expired => "EXPIRED",
    Terminated => "TERMINATED",
});

string_enum!(Currency {
    Usd => "USD",
    Eur => "EUR",
    Gbp => "GBP",
    Cad => "CAD",
    Aud => "AUD",
});

string_enum!(DocumentType {
    Policy => "POLICY",
    Procedure => "PROCEDURE",
    WorkInstruction => "WORK_INSTRUCTION",
    Register => "REGISTER",
    Form => "FORM",
});

string_enum!(DocumentStatus {
    Draft => "DRAFT",
    PendingApproval => "PENDING_APPROVAL",
    Approved => "APPROVED",
    Archived => "ARCHIVED",
});

string_enum!(EquipmentStatus {
    Active => "ACTIVE",
    OutOfService => "OUT_OF_SERVICE",
});

string_enum!(CalibrationResult {
    NotTested => "NOT_TESTED",
    Pass => "PASS",
    Fail => "FAIL",
    AsFound => "AS_FOUND",
});

string_enum!(
    /// Lifecycle of a management review meeting.
    ReviewStatus {
        Draft => "DRAFT",
        Scheduled => "SCHEDULED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Closed => "CLOSED",
    }
);

string_enum!(
    /// Management system standards a review can cover.
    ReviewStandard {
        Iso9001 => "ISO9001",
        Iso14001 => "ISO14001",
        Iso45001 => "ISO45001",
    }
);

string_enum!(MeetingType {
    Quarterly => "QUARTERLY",
    Annual => "ANNUAL",
    Extraordinary => "EXTRAORDINARY",
    Special => "SPECIAL",
});

string_enum!(ReviewInputStatus {
    Pending => "PENDING",
    Provided => "PROVIDED",
    NotApplicable => "NOT_APPLICABLE",
});

string_enum!(ReviewOutputType {
    ImprovementOpportunity => "IMPROVEMENT_OPPORTUNITY",
    ChangeNeeded => "CHANGE_NEEDED",
    ResourceNeed => "RESOURCE_NEED",
    CorrectiveAction => "CORRECTIVE_ACTION",
    StrategyImpact => "STRATEGY_IMPACT",
    SystemAssessment => "SYSTEM_ASSESSMENT",
});

string_enum!(ReviewActionStatus {
    Open => "OPEN",
    InProgress => "IN_PROGRESS",
    Done => "DONE",
    Closed => "CLOSED",
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    fn assert_stored_spelling<T>(all: &[T], as_str: fn(T) -> &'static str)
    where
        T: Serialize + DeserializeOwned + Copy + PartialEq + std::fmt::Debug,
    {
        for value in all {
            let json = serde_json::to_value(value).unwrap();
            assert_eq!(json, serde_json::Value::from(as_str(*value)));
            assert_eq!(serde_json::from_value::<T>(json).unwrap(), *value);
        }
    }

    #[test]
    fn serde_uses_stored_spelling() {
        assert_stored_spelling(AuditStatus::ALL, AuditStatus::as_str);
        assert_stored_spelling(AuditRag::ALL, AuditRag::as_str);
        assert_stored_spelling(AuditMethod::ALL, AuditMethod::as_str);
        assert_stored_spelling(AuditCategory::ALL, AuditCategory::as_str);
        assert_stored_spelling(AuditFrequency::ALL, AuditFrequency::as_str);
        assert_stored_spelling(FindingType::ALL, FindingType::as_str);
        assert_stored_spelling(FindingStatus::ALL, FindingStatus::as_str);
        assert_stored_spelling(RiskStatus::ALL, RiskStatus::as_str);
        assert_stored_spelling(IncidentType::ALL, IncidentType::as_str);
        assert_stored_spelling(IncidentSeverity::ALL, IncidentSeverity::as_str);
        assert_stored_spelling(IncidentStatus::ALL, IncidentStatus::as_str);
        assert_stored_spelling(TrainingStatus::ALL, TrainingStatus::as_str);
        assert_stored_spelling(CaseType::ALL, CaseType::as_str);
        assert_stored_spelling(NcSeverity::ALL, NcSeverity::as_str);
        assert_stored_spelling(NcStatus::ALL, NcStatus::as_str);
        assert_stored_spelling(NcActionType::ALL, NcActionType::as_str);
        assert_stored_spelling(NcActionStatus::ALL, NcActionStatus::as_str);
        assert_stored_spelling(ActionStatus::ALL, ActionStatus::as_str);
        assert_stored_spelling(Level::ALL, Level::as_str);
        assert_stored_spelling(WasteCategory::ALL, WasteCategory::as_str);
        assert_stored_spelling(DisposalMethod::ALL, DisposalMethod::as_str);
        assert_stored_spelling(WasteUnit::ALL, WasteUnit::as_str);
        assert_stored_spelling(WasteStatus::ALL, WasteStatus::as_str);
        assert_stored_spelling(ContractType::ALL, ContractType::as_str);
        assert_stored_spelling(ContractStatus::ALL, ContractStatus::as_str);
        assert_stored_spelling(Currency::ALL, Currency::as_str);
        assert_stored_spelling(DocumentType::ALL, DocumentType::as_str);
        assert_stored_spelling(DocumentStatus::ALL, DocumentStatus::as_str);
        assert_stored_spelling(EquipmentStatus::ALL, EquipmentStatus::as_str);
        assert_stored_spelling(CalibrationResult::ALL, CalibrationResult::as_str);
        assert_stored_spelling(ReviewStatus::ALL, ReviewStatus::as_str);
        assert_stored_spelling(ReviewStandard::ALL, ReviewStandard::as_str);
        assert_stored_spelling(MeetingType::ALL, MeetingType::as_str);
        assert_stored_spelling(ReviewInputStatus::ALL, ReviewInputStatus::as_str);
        assert_stored_spelling(ReviewOutputType::ALL, ReviewOutputType::as_str);
        assert_stored_spelling(ReviewActionStatus::ALL, ReviewActionStatus::as_str);
    }

    #[test]
    fn round_trips_stored_spelling() {
        for status in NcStatus::ALL {
            assert_eq!(status.as_str().parse::<NcStatus>().unwrap(), *status);
        }
        assert_eq!(
            serde_json::to_string(&WasteStatus::InTransit).unwrap(),
            "\"IN_TRANSIT\""
        );
    }

    #[test]
    fn unknown_value_lists_choices() {
        let err = "BOGUS".parse::<AuditMethod>().unwrap_err();
        assert!(err.contains("ON_SITE, REMOTE, HYBRID"), "{err}");
        assert!(serde_json::from_str::<CaseType>("\"nc\"").is_err());
    }

    #[test]
    fn severity_sets_response_window() {
        assert_eq!(NcSeverity::Critical.response_window().num_days(), 5);
        assert_eq!(NcSeverity::High.response_window().num_days(), 10);
        assert_eq!(NcSeverity::Medium.response_window().num_days(), 15);
        assert_eq!(NcSeverity::Low.response_window().num_days(), 20);
    }

    #[test]
    fn action_status_mirrors_nc_action() {
        assert_eq!(ActionStatus::from(NcActionStatus::Done), ActionStatus::Completed);
        assert_eq!(ActionStatus::from(NcActionStatus::InProgress), ActionStatus::InProgress);
        assert_eq!(ActionStatus::from(NcActionStatus::Open), ActionStatus::Open);
    }
}
