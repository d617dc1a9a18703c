//! Row shapes as stored, and their conversion into domain types.

use atec_core::models::child::Child;
use atec_core::models::package::{
    ImageResultAttributeKey, IndicationCategories, Package, Questionnaire,
};
use atec_core::models::result::{AnswerDetail, QuestionnaireResult, ResultDetail};
use atec_core::models::user::User;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::StorageError;

pub(super) fn timestamp(dt: DateTime<Utc>) -> Result<jiff::Timestamp, StorageError> {
    jiff::Timestamp::from_microsecond(dt.timestamp_micros())
        .map_err(|e| StorageError::Internal(format!("timestamp out of range: {e}")))
}

pub(super) fn civil_date(d: NaiveDate) -> Result<jiff::civil::Date, StorageError> {
    jiff::civil::Date::new(d.year() as i16, d.month() as i8, d.day() as i8)
        .map_err(|e| StorageError::Internal(format!("date out of range: {e}")))
}

pub(super) fn naive_date(d: jiff::civil::Date) -> Result<NaiveDate, StorageError> {
    NaiveDate::from_ymd_opt(i32::from(d.year()), d.month() as u32, d.day() as u32)
        .ok_or_else(|| StorageError::Internal(format!("invalid date: {d}")))
}

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub username: String,
    pub is_active: bool,
    pub role: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(super) const USER_COLUMNS: &str =
    "id, email, password, username, is_active, role, phone_number, address, created_at, updated_at";

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            password: row.password,
            username: row.username,
            is_active: row.is_active,
            role: row.role.parse().map_err(StorageError::Internal)?,
            phone_number: row.phone_number,
            address: row.address,
            created_at: timestamp(row.created_at)?,
            updated_at: timestamp(row.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ChildRow {
    pub id: Uuid,
    pub parent_user_id: Uuid,
    pub date_of_birth: NaiveDate,
    pub gender: bool,
    pub name: String,
    pub guardian_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(super) const CHILD_COLUMNS: &str =
    "id, parent_user_id, date_of_birth, gender, name, guardian_name, created_at, updated_at";

impl TryFrom<ChildRow> for Child {
    type Error = StorageError;

    fn try_from(row: ChildRow) -> Result<Self, Self::Error> {
        Ok(Child {
            id: row.id,
            parent_user_id: row.parent_user_id,
            date_of_birth: civil_date(row.date_of_birth)?,
            gender: row.gender,
            name: row.name,
            guardian_name: row.guardian_name,
            created_at: timestamp(row.created_at)?,
            updated_at: timestamp(row.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct PackageRow {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub questionnaire: Json<Questionnaire>,
    pub indication_categories: Json<IndicationCategories>,
    pub image_result_attribute_key: Json<ImageResultAttributeKey>,
    pub is_active: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(super) const PACKAGE_COLUMNS: &str = "id, created_by, name, questionnaire, indication_categories, \
     image_result_attribute_key, is_active, is_locked, created_at, updated_at";

impl TryFrom<PackageRow> for Package {
    type Error = StorageError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        Ok(Package {
            id: row.id,
            created_by: row.created_by,
            name: row.name,
            questionnaire: row.questionnaire.0,
            indication_categories: row.indication_categories.0,
            image_result_attribute_key: row.image_result_attribute_key.0,
            is_active: row.is_active,
            is_locked: row.is_locked,
            created_at: timestamp(row.created_at)?,
            updated_at: timestamp(row.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ResultRow {
    pub id: Uuid,
    pub package_id: Uuid,
    pub child_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub answer: Json<AnswerDetail>,
    pub result: Json<ResultDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(super) const RESULT_COLUMNS: &str =
    "id, package_id, child_id, created_by, answer, result, created_at, updated_at";

impl TryFrom<ResultRow> for QuestionnaireResult {
    type Error = StorageError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        Ok(QuestionnaireResult {
            id: row.id,
            package_id: row.package_id,
            child_id: row.child_id,
            created_by: row.created_by,
            answer: row.answer.0,
            result: row.result.0,
            created_at: timestamp(row.created_at)?,
            updated_at: timestamp(row.updated_at)?,
        })
    }
}

/// Convert every row, failing on the first bad one; empty is NotFound.
pub(super) fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StorageError>
where
    T: TryFrom<R, Error = StorageError>,
{
    if rows.is_empty() {
        return Err(StorageError::NotFound);
    }
    rows.into_iter().map(T::try_from).collect()
}
