//! Bracket builder: turns one certificate into a candidate tier bracket.
//!
//! Placement follows a fixed order of evidence:
//!
//! 1. **Start**: the certificate date, or the join date when the member joined
//!    later (brackets describe membership, not designation history).
//! 2. **Supersession**: if a present, non-resigned certificate supersedes this
//!    one, the bracket ends the day before the *earliest* superseding date and is
//!    Inactive. That end must lie in the past.
//! 3. **Active**: runs to the end of the current membership year.
//! 4. **Inactive/Resigned**: ends on the certificate's last-modified date when
//!    that date is in the past.
//!
//! Anything else is [`Placement::Unrepresentable`]: an expected outcome meaning
//! the scope of practice never became a real membership interval.

use chrono::NaiveDate;

use crate::bracket::{TierBracket, TierStatus};
use crate::certificate::{CertificateKind, CertificateRecord, CertificateStatus, MemberProfile};
use crate::dates::day_before;
use crate::error::IntegrityError;
use crate::rules::RuleRegistry;

/// Why a certificate produced no bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrepresentable {
    /// The kind has no membership tier (winter travel) or no rule.
    NoTier,
    /// The certificate carries no date.
    Undated,
    /// Superseded, but no superseding certificate carries a date.
    SupersederUndated,
    /// No status and nothing supersedes it.
    NoStatus,
    /// Not Active and no last-modified date in the past to end on.
    NoPastLastModified,
}

impl std::fmt::Display for Unrepresentable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoTier => "no membership tier",
            Self::Undated => "certificate has no date",
            Self::SupersederUndated => "superseding certificate has no date",
            Self::NoStatus => "no status and not superseded",
            Self::NoPastLastModified => "no last-modified date in the past",
        };
        f.write_str(s)
    }
}

/// Outcome of placing one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Placed(TierBracket),
    Unrepresentable(Unrepresentable),
}

/// Everything the builder reads besides the certificate itself.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub registry: &'a RuleRegistry,
    pub profile: &'a MemberProfile,
    /// "Today" for past/future checks.
    pub as_of: NaiveDate,
    /// End of the current membership year, if the member ever validated.
    pub year_end: Option<NaiveDate>,
}

impl BuildContext<'_> {
    /// The earliest-dated present, non-resigned certificate superseding `kind`.
    ///
    /// `Some(None)` means a superseder exists but none carries a date.
    fn earliest_superseder(&self, kind: CertificateKind) -> Option<Option<(NaiveDate, CertificateKind)>> {
        let rule = self.registry.get(kind)?;
        let mut present = rule
            .superseded_by
            .iter()
            .filter_map(|k| self.profile.certificate(*k).map(|r| (*k, r)))
            .filter(|(_, r)| !r.is_resigned())
            .peekable();

        present.peek()?;
        Some(present.filter_map(|(k, r)| r.date.map(|d| (d, k))).min())
    }

    /// Place one certificate.
    ///
    /// An Active certificate with no `year_end` is a
    /// [`IntegrityError::MissingAnnualValidation`]. Through
    /// [`crate::convert::Converter`] that cannot happen, since a profile with an
    /// Active certificate and no annual validation is returned early as not yet
    /// joined; the inactive tail is the converter's only route to that error.
    pub fn place(&self, kind: CertificateKind, record: &CertificateRecord) -> Result<Placement, IntegrityError> {
        let Some(rule) = self.registry.get(kind) else {
            return Ok(Placement::Unrepresentable(Unrepresentable::NoTier));
        };
        let Some(date) = record.date else {
            return Ok(Placement::Unrepresentable(Unrepresentable::Undated));
        };

        let start = match self.profile.date_joined {
            Some(joined) if joined > date => joined,
            _ => date,
        };

        match self.earliest_superseder(kind) {
            Some(Some((superseding_date, superseded_by))) => {
                let end = day_before(superseding_date);
                if end >= self.as_of {
                    return Err(IntegrityError::SupersessionNotInPast {
                        kind,
                        superseded_by,
                        end,
                        as_of: self.as_of,
                    });
                }
                return Ok(Placement::Placed(TierBracket::new(rule.slug, TierStatus::Inactive, start, end)));
            }
            Some(None) => return Ok(Placement::Unrepresentable(Unrepresentable::SupersederUndated)),
            None => {}
        }

        let placement = match record.status {
            Some(CertificateStatus::Active) => {
                let end = self.year_end.ok_or_else(|| IntegrityError::MissingAnnualValidation {
                    context: format!("Active {kind} certificate"),
                })?;
                Placement::Placed(TierBracket::new(rule.slug, TierStatus::Active, start, end))
            }
            Some(_) => match record.last_modified {
                Some(last_modified) if last_modified < self.as_of => {
                    Placement::Placed(TierBracket::new(rule.slug, TierStatus::Inactive, start, last_modified))
                }
                _ => Placement::Unrepresentable(Unrepresentable::NoPastLastModified),
            },
            None => Placement::Unrepresentable(Unrepresentable::NoStatus),
        };
        Ok(placement)
    }

    /// Place every dated certificate with a tier, in ascending date order.
    ///
    /// Certificates sharing a date keep rule-table order.
    pub fn build_all(&self) -> Result<Vec<TierBracket>, IntegrityError> {
        let mut certs: Vec<(CertificateKind, &CertificateRecord, NaiveDate)> = self
            .profile
            .certificates
            .iter()
            .filter(|(k, _)| k.has_membership())
            .filter_map(|(k, r)| r.date.map(|d| (*k, r, d)))
            .collect();
        certs.sort_by_key(|(k, _, d)| (*d, self.registry.position(*k)));

        let mut brackets = Vec::with_capacity(certs.len());
        for (kind, record, _) in certs {
            match self.place(kind, record)? {
                Placement::Placed(bracket) => brackets.push(bracket),
                Placement::Unrepresentable(reason @ Unrepresentable::SupersederUndated) => {
                    tracing::warn!(kind = %kind, %reason, "superseded certificate dropped; fix the superseder's date");
                }
                Placement::Unrepresentable(reason) => {
                    tracing::debug!(kind = %kind, %reason, "certificate has no representable bracket");
                }
            }
        }
        Ok(brackets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::ProfileStatus;
    use crate::dates::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn profile() -> MemberProfile {
        let mut p = MemberProfile::new(ProfileStatus::Active);
        p.date_joined = Some(d("2023-11-03"));
        p.last_annual_validation = Some(d("2024-01-05"));
        p
    }

    fn ctx<'a>(registry: &'a RuleRegistry, profile: &'a MemberProfile) -> BuildContext<'a> {
        BuildContext {
            registry,
            profile,
            as_of: d("2026-10-16"),
            year_end: Some(d("2024-12-31")),
        }
    }

    fn active(date: &str) -> CertificateRecord {
        CertificateRecord::new(Some(CertificateStatus::Active), Some(d(date)))
    }

    #[test]
    fn superseded_certificate_ends_day_before_superseder() {
        let reg = RuleRegistry::builtin();
        let mut p = profile();
        p.certificates.insert(CertificateKind::Cgi1, CertificateRecord::new(None, Some(d("2023-10-01"))));
        p.certificates.insert(CertificateKind::Cgi2, active("2024-09-13"));

        let placed = ctx(&reg, &p).place(CertificateKind::Cgi1, &p.certificates[&CertificateKind::Cgi1]).unwrap();
        assert_eq!(
            placed,
            Placement::Placed(TierBracket::new(
                "climbing_gym_instructor_level_1",
                TierStatus::Inactive,
                d("2023-11-03"),
                d("2024-09-12"),
            ))
        );
    }

    #[test]
    fn earliest_superseder_wins() {
        let reg = RuleRegistry::builtin();
        let mut p = profile();
        p.date_joined = Some(d("2001-01-01"));
        p.certificates.insert(CertificateKind::Cgi1, CertificateRecord::new(None, Some(d("2010-01-01"))));
        p.certificates.insert(CertificateKind::Cgi2, CertificateRecord::new(None, Some(d("2014-06-01"))));
        p.certificates.insert(CertificateKind::Cgi3, active("2012-03-01"));

        let Placement::Placed(b) = ctx(&reg, &p).place(CertificateKind::Cgi1, &p.certificates[&CertificateKind::Cgi1]).unwrap() else {
            panic!("expected a bracket");
        };
        assert_eq!(b.end, d("2012-02-29"));
    }

    #[test]
    fn resigned_superseder_is_ignored() {
        let reg = RuleRegistry::builtin();
        let mut p = profile();
        p.certificates.insert(CertificateKind::Cgi1, active("2023-12-01"));
        p.certificates.insert(
            CertificateKind::Cgi2,
            CertificateRecord::new(Some(CertificateStatus::Resigned), Some(d("2024-02-01")))
                .with_last_modified(d("2024-05-01")),
        );

        let Placement::Placed(b) = ctx(&reg, &p).place(CertificateKind::Cgi1, &p.certificates[&CertificateKind::Cgi1]).unwrap() else {
            panic!("expected a bracket");
        };
        assert_eq!(b.status, TierStatus::Active);
        assert_eq!(b.end, d("2024-12-31"));
    }

    #[test]
    fn supersession_ending_in_future_is_integrity_error() {
        let reg = RuleRegistry::builtin();
        let mut p = profile();
        p.certificates.insert(CertificateKind::Cgi1, active("2023-12-01"));
        p.certificates.insert(CertificateKind::Cgi2, active("2027-02-01"));

        let err = ctx(&reg, &p)
            .place(CertificateKind::Cgi1, &p.certificates[&CertificateKind::Cgi1])
            .unwrap_err();
        assert!(matches!(
            err,
            IntegrityError::SupersessionNotInPast { superseded_by: CertificateKind::Cgi2, .. }
        ));
    }

    #[test]
    fn inactive_certificate_ends_on_last_modified() {
        let reg = RuleRegistry::builtin();
        let p = profile();
        let record = CertificateRecord::new(Some(CertificateStatus::Resigned), Some(d("2015-12-01")))
            .with_last_modified(d("2024-03-01"));

        let placed = ctx(&reg, &p).place(CertificateKind::Vfg, &record).unwrap();
        assert_eq!(
            placed,
            Placement::Placed(TierBracket::new(
                "via_ferrata_guide",
                TierStatus::Inactive,
                d("2023-11-03"),
                d("2024-03-01"),
            ))
        );
    }

    #[test]
    fn unrepresentable_outcomes() {
        let reg = RuleRegistry::builtin();
        let p = profile();
        let c = ctx(&reg, &p);

        let no_status = CertificateRecord::new(None, Some(d("2020-01-01")));
        assert_eq!(
            c.place(CertificateKind::Trci, &no_status).unwrap(),
            Placement::Unrepresentable(Unrepresentable::NoStatus)
        );

        let future_modified = CertificateRecord::new(Some(CertificateStatus::Inactive), Some(d("2020-01-01")))
            .with_last_modified(d("2030-01-01"));
        assert_eq!(
            c.place(CertificateKind::Trci, &future_modified).unwrap(),
            Placement::Unrepresentable(Unrepresentable::NoPastLastModified)
        );

        let undated = CertificateRecord::new(Some(CertificateStatus::Active), None);
        assert_eq!(
            c.place(CertificateKind::Trci, &undated).unwrap(),
            Placement::Unrepresentable(Unrepresentable::Undated)
        );

        let acquired = CertificateRecord::new(Some(CertificateStatus::Acquired), Some(d("2020-01-01")));
        assert_eq!(
            c.place(CertificateKind::WinterTravel, &acquired).unwrap(),
            Placement::Unrepresentable(Unrepresentable::NoTier)
        );
    }

    #[test]
    fn undated_superseder_leaves_certificate_unplaced() {
        let reg = RuleRegistry::builtin();
        let mut p = profile();
        p.certificates.insert(CertificateKind::Cgi1, active("2023-12-01"));
        p.certificates.insert(
            CertificateKind::Cgi2,
            CertificateRecord::default().with_last_modified(d("2024-05-01")),
        );

        let c = ctx(&reg, &p);
        assert_eq!(
            c.place(CertificateKind::Cgi1, &p.certificates[&CertificateKind::Cgi1]).unwrap(),
            Placement::Unrepresentable(Unrepresentable::SupersederUndated)
        );
        assert!(c.build_all().unwrap().is_empty());
    }

    #[test]
    fn same_day_certificates_keep_rule_table_order() {
        let reg = RuleRegistry::builtin();
        let mut p = profile();
        p.date_joined = Some(d("2009-01-01"));
        p.certificates.insert(CertificateKind::Ag, active("2010-05-01"));
        p.certificates.insert(CertificateKind::Rg, active("2010-05-01"));

        let slugs: Vec<_> = ctx(&reg, &p).build_all().unwrap().into_iter().map(|b| b.slug).collect();
        assert_eq!(slugs, ["rock_guide", "alpine_guide"]);
    }

    #[test]
    fn active_without_annual_validation_is_integrity_error() {
        let reg = RuleRegistry::builtin();
        let p = profile();
        let c = BuildContext { year_end: None, ..ctx(&reg, &p) };
        let err = c.place(CertificateKind::Vfg, &active("2020-01-01")).unwrap_err();
        assert!(matches!(err, IntegrityError::MissingAnnualValidation { .. }));
    }

    #[test]
    fn build_all_orders_by_certificate_date() {
        let reg = RuleRegistry::builtin();
        let mut p = profile();
        p.date_joined = Some(d("2024-09-09"));
        p.certificates.insert(CertificateKind::Ahg, active("2024-06-12"));
        p.certificates.insert(CertificateKind::Cgi1, active("2022-06-01"));
        p.certificates.insert(
            CertificateKind::WinterTravel,
            CertificateRecord::new(Some(CertificateStatus::Acquired), Some(d("2023-01-01"))),
        );

        let brackets = ctx(&reg, &p).build_all().unwrap();
        let slugs: Vec<_> = brackets.iter().map(|b| b.slug.as_str()).collect();
        assert_eq!(slugs, ["climbing_gym_instructor_level_1", "apprentice_hiking_guide"]);
        assert!(brackets.iter().all(|b| b.start == d("2024-09-09")));
    }
}
