use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Cut-off used to decide whether a `grading` claim has been abandoned.
pub(crate) fn seconds_before(now: PrimitiveDateTime, seconds: u64) -> PrimitiveDateTime {
    let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
    now.checked_sub(Duration::seconds(seconds)).unwrap_or(PrimitiveDateTime::MIN)
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) mod rfc3339 {
    use serde::Serializer;
    use time::PrimitiveDateTime;

    pub(crate) fn serialize<S: Serializer>(
        value: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_primitive(*value))
    }

    pub(crate) mod option {
        use serde::Serializer;
        use time::PrimitiveDateTime;

        pub(crate) fn serialize<S: Serializer>(
            value: &Option<PrimitiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_str(&super::super::format_primitive(*value)),
                None => serializer.serialize_none(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    fn sample() -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        PrimitiveDateTime::new(date, time)
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(sample()), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn seconds_before_subtracts() {
        let cutoff = seconds_before(sample(), 600);
        assert_eq!(format_primitive(cutoff), "2025-01-02T10:10:30Z");
    }

    #[test]
    fn seconds_before_saturates() {
        assert_eq!(seconds_before(sample(), u64::MAX), PrimitiveDateTime::MIN);
    }
}
