use regex::RegexBuilder;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::{ExpenseRow, MatchField, OverrideRule};

/// Load the rules applicable to one unit: global rules plus rules scoped to
/// that unit, in insertion order. Insertion order is the evaluation order;
/// a later rule may match the rewritten output of an earlier one.
pub fn load_rules(conn: &Connection, unit_id: Option<i64>) -> Result<Vec<OverrideRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, unit_id, match_field, match_type, match_value, replacement \
         FROM override_rules WHERE unit_id IS NULL OR unit_id = ?1 ORDER BY id",
    )?;
    let rules = stmt
        .query_map([unit_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rules
        .into_iter()
        .filter_map(|(id, unit_id, field, match_type, match_value, replacement)| {
            Some(OverrideRule {
                id,
                unit_id,
                match_field: MatchField::from_key(&field)?,
                match_type,
                match_value,
                replacement,
            })
        })
        .collect())
}

fn rule_matches(rule: &OverrideRule, value: &str) -> bool {
    match rule.match_type.as_str() {
        "equals" => value.to_lowercase() == rule.match_value.to_lowercase(),
        "contains" => value.to_lowercase().contains(&rule.match_value.to_lowercase()),
        "regex" => RegexBuilder::new(&rule.match_value)
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(value))
            .unwrap_or(false),
        _ => false,
    }
}

/// Apply the rules to a projection of rows, rewriting descriptions in
/// place. Stored rows are never touched; every rule whose predicate matches
/// the field's *current* value fires, in order, so rewrites can compound.
pub fn apply_rules(rules: &[OverrideRule], rows: &mut [ExpenseRow]) {
    for rule in rules {
        for row in rows.iter_mut() {
            let field_value = match rule.match_field {
                MatchField::Description => row.description.as_deref(),
                MatchField::Subaccount => row.subaccount.as_deref(),
                MatchField::Account => row.account.as_deref(),
            };
            if let Some(value) = field_value {
                if rule_matches(rule, value) {
                    row.description = Some(rule.replacement.clone());
                }
            }
        }
    }
}

pub fn add_rule(
    conn: &Connection,
    unit_id: Option<i64>,
    field: MatchField,
    match_type: &str,
    match_value: &str,
    replacement: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO override_rules (unit_id, match_field, match_type, match_value, replacement) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![unit_id, field.key(), match_type, match_value, replacement],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Capture a review-grid description edit as a persistent, unit-scoped
/// `equals` rule: every row in that unit whose original description is
/// exactly `old` will read as `new` from now on. Returns `false` when the
/// edit is a no-op.
pub fn record_description_edit(conn: &Connection, unit_id: i64, old: &str, new: &str) -> Result<bool> {
    if old == new {
        return Ok(false);
    }
    add_rule(conn, Some(unit_id), MatchField::Description, "equals", old, new)?;
    Ok(true)
}

pub fn delete_rule(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM override_rules WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(crate::error::ApuraError::Other(format!("No rule with ID {id}")));
    }
    Ok(())
}
