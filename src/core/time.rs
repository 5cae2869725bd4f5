use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Database timestamps are naive UTC (`TIMESTAMP WITHOUT TIME ZONE`).
pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn to_primitive_utc_normalises_offset() {
        let date = Date::from_calendar_date(2025, time::Month::March, 1).unwrap();
        let time = Time::from_hms(9, 0, 0).unwrap();
        let jakarta = PrimitiveDateTime::new(date, time)
            .assume_offset(UtcOffset::from_hms(7, 0, 0).unwrap());

        let utc = to_primitive_utc(jakarta);
        assert_eq!(utc.hour(), 2);
        assert_eq!(utc.date(), date);
    }
}
