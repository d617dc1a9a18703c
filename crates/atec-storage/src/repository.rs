//! Repository traits shared by every backend.
//!
//! Reads never return soft-deleted rows. `search` returning no rows is
//! [`StorageError::NotFound`] so callers handle "nothing to show" explicitly.

use std::any::Any;

use atec_core::models::child::Child;
use atec_core::models::package::{Package, PackageContent};
use atec_core::models::result::{AnswerDetail, QuestionnaireResult, ResultDetail};
use atec_core::models::user::{Role, User};
use uuid::Uuid;

use crate::error::StorageError;

pub use atec_core::BoxFuture;

/// An open unit of work. Commit and rollback consume the handle, so each can
/// happen at most once and a finished transaction cannot be reused.
pub trait Transaction: Send {
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StorageError>>;

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StorageError>>;

    /// Backend access to the concrete handle.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub trait TxFactory: Send + Sync {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>, StorageError>>;
}

/// Borrowed transaction slot accepted by write operations.
pub type Tx<'a> = Option<&'a mut dyn Transaction>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub username: String,
    pub is_active: bool,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

pub trait UserRepository: Send + Sync {
    fn create<'a>(&'a self, input: NewUser, tx: Tx<'a>) -> BoxFuture<'a, Result<User, StorageError>>;

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<User, StorageError>>;

    /// Lookup by email ciphertext.
    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<User, StorageError>>;

    fn find_by_role(&self, role: Role, limit: i64, offset: i64) -> BoxFuture<'_, Result<Vec<User>, StorageError>>;

    fn update<'a>(&'a self, id: Uuid, patch: UserPatch, tx: Tx<'a>) -> BoxFuture<'a, Result<User, StorageError>>;

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>>;
}

#[derive(Debug, Clone)]
pub struct NewChild {
    pub parent_user_id: Uuid,
    pub date_of_birth: jiff::civil::Date,
    pub gender: bool,
    pub name: String,
    pub guardian_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChildPatch {
    pub date_of_birth: Option<jiff::civil::Date>,
    pub gender: Option<bool>,
    pub name: Option<String>,
    pub guardian_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChildFilter {
    pub parent_user_id: Option<Uuid>,
    /// Case-insensitive substring match.
    pub name: Option<String>,
    pub gender: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

pub trait ChildRepository: Send + Sync {
    fn create<'a>(&'a self, input: NewChild, tx: Tx<'a>) -> BoxFuture<'a, Result<Child, StorageError>>;

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Child, StorageError>>;

    fn search(&self, filter: ChildFilter) -> BoxFuture<'_, Result<Vec<Child>, StorageError>>;

    fn update<'a>(&'a self, id: Uuid, patch: ChildPatch, tx: Tx<'a>) -> BoxFuture<'a, Result<Child, StorageError>>;
}

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub created_by: Uuid,
    pub content: PackageContent,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PackagePatch {
    pub content: Option<PackageContent>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub is_active: Option<bool>,
    pub is_locked: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

pub trait PackageRepository: Send + Sync {
    fn create<'a>(&'a self, input: NewPackage, tx: Tx<'a>) -> BoxFuture<'a, Result<Package, StorageError>>;

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Package, StorageError>>;

    fn search(&self, filter: PackageFilter) -> BoxFuture<'_, Result<Vec<Package>, StorageError>>;

    /// The oldest package that is both active and locked.
    fn find_oldest_active_and_locked(&self) -> BoxFuture<'_, Result<Package, StorageError>>;

    fn update<'a>(&'a self, id: Uuid, patch: PackagePatch, tx: Tx<'a>) -> BoxFuture<'a, Result<Package, StorageError>>;

    /// Set `is_locked`. Idempotent; never clears the flag.
    fn mark_locked(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Soft delete.
    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>>;
}

#[derive(Debug, Clone)]
pub struct NewResult {
    pub package_id: Uuid,
    pub child_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub answer: AnswerDetail,
    pub result: ResultDetail,
}

#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub child_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

pub trait ResultRepository: Send + Sync {
    fn create<'a>(&'a self, input: NewResult, tx: Tx<'a>) -> BoxFuture<'a, Result<QuestionnaireResult, StorageError>>;

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<QuestionnaireResult, StorageError>>;

    /// Ordered by `created_at` ascending.
    fn search(&self, filter: ResultFilter) -> BoxFuture<'_, Result<Vec<QuestionnaireResult>, StorageError>>;

    /// Results submitted by `user_id` or attached to one of their children.
    fn find_user_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> BoxFuture<'_, Result<Vec<QuestionnaireResult>, StorageError>>;
}
