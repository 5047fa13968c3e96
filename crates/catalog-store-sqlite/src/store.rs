//! [`SqliteStore`], the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use catalog_core::{
  course::{
    Course, CourseFields, CourseRef, CourseView, CuratedFields, EligibilityRecord,
    Variant, VariantWrite,
  },
  relationship::{NewRelationship, Relationship, RelationshipType},
  store::CatalogStore,
};

use crate::{
  Error, Result,
  encode::{
    COURSE_COLUMNS, RELATIONSHIP_COLUMNS, RawCourse, RawCourseRef, RawEligibility,
    RawRelationship, RawVariant, decode_uuid, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A course catalog backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `DELETE ... WHERE course_id = ?1` and return the row count.
  async fn delete_children(&self, table: &'static str, course_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(course_id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("DELETE FROM {table} WHERE course_id = ?1"),
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(n as u64)
  }

  async fn query_relationships(
    &self,
    sql_where: &'static str,
    params: Vec<String>,
  ) -> Result<Vec<Relationship>> {
    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RELATIONSHIP_COLUMNS} FROM course_relationships {sql_where}
           ORDER BY course_id, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRelationship::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_relationship).collect()
  }
}

/// True for a primary-key or unique-index collision.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Courses ───────────────────────────────────────────────────────────────

  async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>> {
    let id_str = encode_uuid(course_id);

    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE course_id = ?1"),
            rusqlite::params![id_str],
            RawCourse::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn find_course_by_code(&self, code: String) -> Result<Option<Course>> {
    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE external_code = ?1"),
            rusqlite::params![code],
            RawCourse::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn courses_with_code_prefix(&self, prefix: String) -> Result<Vec<CourseRef>> {
    // substr() rather than LIKE: LIKE is case-insensitive and treats `%` and
    // `_` in the prefix as wildcards.
    let raws: Vec<RawCourseRef> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT course_id, external_code FROM courses
           WHERE substr(external_code, 1, length(?1)) = ?1
           ORDER BY external_code",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![prefix], |row| {
            Ok(RawCourseRef {
              course_id:     row.get(0)?,
              external_code: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourseRef::into_ref).collect()
  }

  async fn list_courses(&self, offered_only: bool) -> Result<Vec<Course>> {
    let raws: Vec<RawCourse> = self
      .conn
      .call(move |conn| {
        let filter = if offered_only { "WHERE is_offered = 1" } else { "" };
        let mut stmt = conn.prepare(&format!(
          "SELECT {COURSE_COLUMNS} FROM courses {filter} ORDER BY external_code"
        ))?;
        let rows = stmt
          .query_map([], RawCourse::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }

  async fn insert_course(&self, fields: CourseFields) -> Result<Course> {
    let now = Utc::now();
    let course = Course {
      course_id:             Uuid::new_v4(),
      external_code:         fields.external_code,
      external_uuid:         fields.external_uuid,
      name:                  fields.name,
      credits:               fields.credits,
      length:                fields.length,
      gpa_weight:            fields.gpa_weight,
      subject:               fields.subject,
      is_elective:           fields.is_elective,
      is_offered:            true,
      is_new:                true,
      description:           String::new(),
      notes:                 String::new(),
      last_snapshot_payload: fields.last_snapshot_payload,
      created_at:            now,
      updated_at:            now,
      last_seen_at:          now,
    };

    let id_str      = encode_uuid(course.course_id);
    let code        = course.external_code.clone();
    let ext_uuid    = course.external_uuid.clone();
    let name        = course.name.clone();
    let credits     = course.credits;
    let length      = course.length;
    let gpa_weight  = course.gpa_weight;
    let subject     = course.subject.clone();
    let is_elective = course.is_elective;
    let payload     = course.last_snapshot_payload.to_string();
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO courses (
             course_id, external_code, external_uuid, name, credits, length,
             gpa_weight, subject, is_elective, is_offered, is_new, description, notes,
             last_snapshot_payload, created_at, updated_at, last_seen_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, 1, '', '', ?10, ?11, ?11, ?11)",
          rusqlite::params![
            id_str, code, ext_uuid, name, credits, length, gpa_weight, subject,
            is_elective, payload, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(course)
  }

  async fn update_course(&self, course_id: Uuid, fields: CourseFields) -> Result<()> {
    let id_str  = encode_uuid(course_id);
    let payload = fields.last_snapshot_payload.to_string();
    let at_str  = encode_dt(Utc::now());

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE courses SET
             external_code = ?2, external_uuid = ?3, name = ?4, credits = ?5,
             length = ?6, gpa_weight = ?7, subject = ?8, is_elective = ?9,
             is_offered = 1, is_new = 0, last_snapshot_payload = ?10,
             updated_at = ?11, last_seen_at = ?11
           WHERE course_id = ?1",
          rusqlite::params![
            id_str,
            fields.external_code,
            fields.external_uuid,
            fields.name,
            fields.credits,
            fields.length,
            fields.gpa_weight,
            fields.subject,
            fields.is_elective,
            payload,
            at_str,
          ],
        )?)
      })
      .await?;

    if n == 0 {
      return Err(Error::CourseNotFound(course_id));
    }
    Ok(())
  }

  async fn update_curated(&self, course_id: Uuid, curated: CuratedFields) -> Result<()> {
    let id_str = encode_uuid(course_id);
    let at_str = encode_dt(Utc::now());

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE courses SET description = ?2, notes = ?3, updated_at = ?4
           WHERE course_id = ?1",
          rusqlite::params![id_str, curated.description, curated.notes, at_str],
        )?)
      })
      .await?;

    if n == 0 {
      return Err(Error::CourseNotFound(course_id));
    }
    Ok(())
  }

  async fn deactivate_missing(&self, present_codes: Vec<String>) -> Result<u64> {
    let codes_json = serde_json::to_string(&present_codes)?;
    let at_str     = encode_dt(Utc::now());

    let n = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE course_variants SET is_offered = 0
           WHERE is_offered = 1 AND course_id IN (
             SELECT course_id FROM courses
             WHERE external_code NOT IN (SELECT value FROM json_each(?1))
           )",
          rusqlite::params![codes_json],
        )?;
        let n = tx.execute(
          "UPDATE courses SET is_offered = 0, updated_at = ?2
           WHERE is_offered = 1
             AND external_code NOT IN (SELECT value FROM json_each(?1))",
          rusqlite::params![codes_json, at_str],
        )?;
        tx.commit()?;
        Ok(n)
      })
      .await?;

    tracing::debug!(retired = n, "courses marked not offered");
    Ok(n as u64)
  }

  // ── Child collections ─────────────────────────────────────────────────────

  async fn delete_tags(&self, course_id: Uuid) -> Result<u64> {
    self.delete_children("course_tags", course_id).await
  }

  async fn insert_tag(&self, course_id: Uuid, tag: String) -> Result<()> {
    let id_str = encode_uuid(course_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO course_tags (course_id, tag) VALUES (?1, ?2)",
          rusqlite::params![id_str, tag],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_eligibility(&self, course_id: Uuid) -> Result<u64> {
    self.delete_children("course_eligibility", course_id).await
  }

  async fn insert_eligibility(&self, record: EligibilityRecord) -> Result<()> {
    let id_str = encode_uuid(record.course_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO course_eligibility (course_id, grade, term_number, term_name, can_plan)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            id_str,
            record.grade,
            record.term_number,
            record.term_name,
            record.can_plan,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_variants(&self, course_id: Uuid) -> Result<u64> {
    self.delete_children("course_variants", course_id).await
  }

  async fn upsert_variant(&self, variant: Variant) -> Result<VariantWrite> {
    let id_str = encode_uuid(variant.course_id);

    let previous: Option<String> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO course_variants (variant_code, course_id, name, delivery_mode, is_offered)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            variant.variant_code,
            id_str,
            variant.name,
            variant.delivery_mode,
            variant.is_offered,
          ],
        );

        match inserted {
          Ok(_) => Ok(None),
          // The code belongs to another course: move it here in place.
          Err(e) if is_unique_violation(&e) => {
            let tx = conn.transaction()?;
            let previous: String = tx.query_row(
              "SELECT course_id FROM course_variants WHERE variant_code = ?1",
              rusqlite::params![variant.variant_code],
              |r| r.get(0),
            )?;
            tx.execute(
              "UPDATE course_variants
               SET course_id = ?2, name = ?3, delivery_mode = ?4, is_offered = ?5
               WHERE variant_code = ?1",
              rusqlite::params![
                variant.variant_code,
                id_str,
                variant.name,
                variant.delivery_mode,
                variant.is_offered,
              ],
            )?;
            tx.commit()?;
            Ok(Some(previous))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match previous {
      None => Ok(VariantWrite::Inserted),
      Some(prev) => Ok(VariantWrite::Reassigned { previous_course_id: decode_uuid(&prev)? }),
    }
  }

  // ── Relationships ─────────────────────────────────────────────────────────

  async fn delete_relationships(&self, course_id: Uuid) -> Result<u64> {
    self.delete_children("course_relationships", course_id).await
  }

  async fn insert_relationship(&self, input: NewRelationship) -> Result<Relationship> {
    let rel = Relationship {
      relationship_id:     Uuid::new_v4(),
      course_id:           input.course_id,
      related_course_id:   input.related_course_id,
      related_course_code: input.related_course_code,
      relationship_type:   input.relationship_type,
      group_id:            input.group_id,
      logic_type:          input.logic_type,
      description:         input.description,
    };

    let rel_id_str  = encode_uuid(rel.relationship_id);
    let course_str  = encode_uuid(rel.course_id);
    let related_str = rel.related_course_id.map(encode_uuid);
    let code        = rel.related_course_code.clone();
    let kind_str    = rel.relationship_type.to_string();
    let group_str   = rel.group_id.map(encode_uuid);
    let logic_str   = rel.logic_type.to_string();
    let description = rel.description.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO course_relationships (
             relationship_id, course_id, related_course_id, related_course_code,
             relationship_type, group_id, logic_type, description
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            rel_id_str, course_str, related_str, code, kind_str, group_str, logic_str,
            description,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(rel)
  }

  async fn get_relationship(&self, relationship_id: Uuid) -> Result<Option<Relationship>> {
    let rows = self
      .query_relationships("WHERE relationship_id = ?1", vec![encode_uuid(relationship_id)])
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn relationships_for(
    &self,
    course_id: Uuid,
    kind: Option<RelationshipType>,
  ) -> Result<Vec<Relationship>> {
    let course_str = encode_uuid(course_id);
    match kind {
      Some(k) => {
        self
          .query_relationships(
            "WHERE course_id = ?1 AND relationship_type = ?2",
            vec![course_str, k.to_string()],
          )
          .await
      }
      None => self.query_relationships("WHERE course_id = ?1", vec![course_str]).await,
    }
  }

  async fn unresolved_relationships(&self) -> Result<Vec<Relationship>> {
    self
      .query_relationships("WHERE related_course_id IS NULL", Vec::new())
      .await
  }

  async fn set_relationship_target(
    &self,
    relationship_id: Uuid,
    code: String,
    related_course_id: Option<Uuid>,
  ) -> Result<()> {
    let id_str      = encode_uuid(relationship_id);
    let related_str = related_course_id.map(encode_uuid);

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE course_relationships
           SET related_course_code = ?2, related_course_id = ?3
           WHERE relationship_id = ?1",
          rusqlite::params![id_str, code, related_str],
        )?)
      })
      .await?;

    if n == 0 {
      return Err(Error::RelationshipNotFound(relationship_id));
    }
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn materialize(&self, course_id: Uuid) -> Result<Option<CourseView>> {
    let course = match self.get_course(course_id).await? {
      Some(c) => c,
      None    => return Ok(None),
    };

    let id_str = encode_uuid(course_id);
    let (tags, eligibility, variants): (Vec<String>, Vec<RawEligibility>, Vec<RawVariant>) = self
      .conn
      .call(move |conn| {
        let tags = conn
          .prepare("SELECT tag FROM course_tags WHERE course_id = ?1 ORDER BY tag")?
          .query_map(rusqlite::params![id_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        let eligibility = conn
          .prepare(
            "SELECT course_id, grade, term_number, term_name, can_plan
             FROM course_eligibility WHERE course_id = ?1
             ORDER BY grade, term_number",
          )?
          .query_map(rusqlite::params![id_str], |r| {
            Ok(RawEligibility {
              course_id:   r.get(0)?,
              grade:       r.get(1)?,
              term_number: r.get(2)?,
              term_name:   r.get(3)?,
              can_plan:    r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let variants = conn
          .prepare(
            "SELECT variant_code, course_id, name, delivery_mode, is_offered
             FROM course_variants WHERE course_id = ?1
             ORDER BY variant_code",
          )?
          .query_map(rusqlite::params![id_str], |r| {
            Ok(RawVariant {
              variant_code:  r.get(0)?,
              course_id:     r.get(1)?,
              name:          r.get(2)?,
              delivery_mode: r.get(3)?,
              is_offered:    r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((tags, eligibility, variants))
      })
      .await?;

    Ok(Some(CourseView {
      course,
      tags,
      eligibility: eligibility
        .into_iter()
        .map(RawEligibility::into_record)
        .collect::<Result<_>>()?,
      variants: variants
        .into_iter()
        .map(RawVariant::into_variant)
        .collect::<Result<_>>()?,
    }))
  }
}
