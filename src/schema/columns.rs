//! Column names and the raw customer record layout

/// Identifier column; carried through batch output, never used as a feature
pub const ID_COLUMN: &str = "customerID";

/// Training label column
pub const TARGET_COLUMN: &str = "Churn";

/// Total charges column, coerced to a number during normalization
pub const TOTAL_CHARGES: &str = "TotalCharges";

/// Columns standardized with the frozen scaling parameters, in scaler order
pub const SCALED_COLUMNS: [&str; 3] = ["tenure", "MonthlyCharges", TOTAL_CHARGES];

/// Columns expected to hold numbers (scaled columns plus the senior flag)
pub const NUMERIC_COLUMNS: [&str; 4] = ["SeniorCitizen", "tenure", "MonthlyCharges", TOTAL_CHARGES];

/// Returns true for the three standardized columns
pub fn is_scaled_column(name: &str) -> bool {
    SCALED_COLUMNS.contains(&name)
}

/// Kind of value a raw record field holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// One of a fixed set of text values
    Categorical(&'static [&'static str]),
    /// Number within an inclusive range
    Numeric { min: f64, max: f64, default: f64 },
}

/// Description of one raw record field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Default value offered by interactive collaborators
    pub fn default_value(&self) -> String {
        match self.kind {
            FieldKind::Categorical(choices) => choices[0].to_string(),
            FieldKind::Numeric { default, .. } => default.to_string(),
        }
    }
}

const YES_NO: &[&str] = &["No", "Yes"];
const PHONE_DEPENDENT: &[&str] = &["No", "Yes", "No phone service"];
const INTERNET_DEPENDENT: &[&str] = &["No", "Yes", "No internet service"];

/// Raw fields of a customer record, in form order.
///
/// `TotalCharges` is not listed: forms derive it as tenure × monthly charges.
pub const RECORD_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "gender", label: "Gender", kind: FieldKind::Categorical(&["Female", "Male"]) },
    FieldSpec {
        name: "SeniorCitizen",
        label: "Senior citizen (0/1)",
        kind: FieldKind::Numeric { min: 0.0, max: 1.0, default: 0.0 },
    },
    FieldSpec { name: "Partner", label: "Has partner", kind: FieldKind::Categorical(YES_NO) },
    FieldSpec { name: "Dependents", label: "Has dependents", kind: FieldKind::Categorical(YES_NO) },
    FieldSpec {
        name: "tenure",
        label: "Tenure (months)",
        kind: FieldKind::Numeric { min: 0.0, max: 72.0, default: 12.0 },
    },
    FieldSpec { name: "PhoneService", label: "Phone service", kind: FieldKind::Categorical(YES_NO) },
    FieldSpec { name: "MultipleLines", label: "Multiple lines", kind: FieldKind::Categorical(PHONE_DEPENDENT) },
    FieldSpec {
        name: "InternetService",
        label: "Internet service",
        kind: FieldKind::Categorical(&["DSL", "Fiber optic", "No"]),
    },
    FieldSpec { name: "OnlineSecurity", label: "Online security", kind: FieldKind::Categorical(INTERNET_DEPENDENT) },
    FieldSpec { name: "OnlineBackup", label: "Online backup", kind: FieldKind::Categorical(INTERNET_DEPENDENT) },
    FieldSpec {
        name: "DeviceProtection",
        label: "Device protection",
        kind: FieldKind::Categorical(INTERNET_DEPENDENT),
    },
    FieldSpec { name: "TechSupport", label: "Tech support", kind: FieldKind::Categorical(INTERNET_DEPENDENT) },
    FieldSpec { name: "StreamingTV", label: "Streaming TV", kind: FieldKind::Categorical(INTERNET_DEPENDENT) },
    FieldSpec {
        name: "StreamingMovies",
        label: "Streaming movies",
        kind: FieldKind::Categorical(INTERNET_DEPENDENT),
    },
    FieldSpec {
        name: "Contract",
        label: "Contract",
        kind: FieldKind::Categorical(&["Month-to-month", "One year", "Two year"]),
    },
    FieldSpec { name: "PaperlessBilling", label: "Paperless billing", kind: FieldKind::Categorical(YES_NO) },
    FieldSpec {
        name: "PaymentMethod",
        label: "Payment method",
        kind: FieldKind::Categorical(&[
            "Electronic check",
            "Mailed check",
            "Bank transfer (automatic)",
            "Credit card (automatic)",
        ]),
    },
    FieldSpec {
        name: "MonthlyCharges",
        label: "Monthly charges ($)",
        kind: FieldKind::Numeric { min: 0.0, max: 200.0, default: 70.0 },
    },
];

/// Look up a record field by name
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    RECORD_FIELDS.iter().find(|f| f.name == name)
}
