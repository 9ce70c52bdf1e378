use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde uses the same lowercase strings as the database column.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Sex {
    Female => "female",
    Male => "male",
});

str_enum!(PatientStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(ConsultationType {
    Prenatal => "prenatal",
    Postpartum => "postpartum",
    FamilyPlanning => "family_planning",
    Gynecological => "gynecological",
    Emergency => "emergency",
    Other => "other",
});

str_enum!(DeliveryType {
    Vaginal => "vaginal",
    Cesarean => "cesarean",
});

str_enum!(NewbornSex {
    Female => "female",
    Male => "male",
    Undetermined => "undetermined",
});

str_enum!(ReferralPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

str_enum!(ReferralStatus {
    Pending => "pending",
    Accepted => "accepted",
    Completed => "completed",
    Rejected => "rejected",
});

str_enum!(ProgramStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(EnrollmentStage {
    Enrolled => "enrolled",
    InProgress => "in_progress",
    Completed => "completed",
    Withdrawn => "withdrawn",
});

str_enum!(Role {
    Admin => "admin",
    Obstetrician => "obstetrician",
});

str_enum!(Shift {
    Morning => "morning",
    Afternoon => "afternoon",
    Night => "night",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn as_str_and_from_str_agree() {
        for role in Role::all() {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), *role);
        }
        for stage in EnrollmentStage::all() {
            assert_eq!(EnrollmentStage::from_str(stage.as_str()).unwrap(), *stage);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = Shift::from_str("weekend").unwrap_err();
        match err {
            DatabaseError::InvalidEnum { field, value } => {
                assert_eq!(field, "Shift");
                assert_eq!(value, "weekend");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serde_uses_column_strings() {
        let json = serde_json::to_string(&ConsultationType::FamilyPlanning).unwrap();
        assert_eq!(json, "\"family_planning\"");
        let parsed: ReferralPriority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(parsed, ReferralPriority::Urgent);
    }
}
