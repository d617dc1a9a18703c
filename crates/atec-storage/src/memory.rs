//! In-process backend. Same contracts as the PostgreSQL one, including soft
//! deletes and `NotFound` on empty searches.

use std::any::Any;
use std::sync::Arc;

use atec_core::models::child::Child;
use atec_core::models::package::Package;
use atec_core::models::result::QuestionnaireResult;
use atec_core::models::user::{Role, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StorageError;
use crate::repository::{
    BoxFuture, ChildFilter, ChildPatch, ChildRepository, NewChild, NewPackage, NewResult, NewUser,
    PackageFilter, PackagePatch, PackageRepository, ResultFilter, ResultRepository, Transaction,
    Tx, TxFactory, UserPatch, UserRepository,
};

struct Row<T> {
    value: T,
    deleted: bool,
}

/// Rows are kept in insertion order, which is also `created_at` order.
#[derive(Default)]
struct Tables {
    users: Vec<Row<User>>,
    children: Vec<Row<Child>>,
    packages: Vec<Row<Package>>,
    results: Vec<Row<QuestionnaireResult>>,
}

trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for User {
    fn key(&self) -> Uuid {
        self.id
    }
}
impl Keyed for Child {
    fn key(&self) -> Uuid {
        self.id
    }
}
impl Keyed for Package {
    fn key(&self) -> Uuid {
        self.id
    }
}
impl Keyed for QuestionnaireResult {
    fn key(&self) -> Uuid {
        self.id
    }
}

fn live<T>(rows: &[Row<T>]) -> impl Iterator<Item = &T> {
    rows.iter().filter(|r| !r.deleted).map(|r| &r.value)
}

fn find<T: Keyed + Clone>(rows: &[Row<T>], id: Uuid) -> Result<T, StorageError> {
    live(rows)
        .find(|v| v.key() == id)
        .cloned()
        .ok_or(StorageError::NotFound)
}

fn replace<T: Keyed>(rows: &mut [Row<T>], value: T) {
    if let Some(row) = rows.iter_mut().find(|r| r.value.key() == value.key()) {
        row.value = value;
    }
}

fn page<T: Clone>(items: Vec<&T>, limit: i64, offset: i64) -> Result<Vec<T>, StorageError> {
    let out: Vec<T> = items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect();
    if out.is_empty() {
        return Err(StorageError::NotFound);
    }
    Ok(out)
}

/// Patches the live row so concurrent `mark_locked` calls are kept.
fn apply_package_patch(package: &mut Package, patch: PackagePatch) {
    if let Some(content) = patch.content {
        package.name = content.name;
        package.questionnaire = content.questionnaire;
        package.indication_categories = content.indication_categories;
        package.image_result_attribute_key = content.image_result_attribute_key;
    }
    if let Some(active) = patch.is_active {
        package.is_active = active;
    }
    package.updated_at = jiff::Timestamp::now();
}

type Staged = Box<dyn FnOnce(&mut Tables) + Send>;

pub struct MemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    staged: Vec<Staged>,
}

impl Transaction for MemoryTransaction {
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StorageError>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            for op in self.staged {
                op(&mut tables);
            }
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StorageError>> {
        Box::pin(async move { Ok(()) })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn staging(tx: &mut dyn Transaction) -> Result<&mut Vec<Staged>, StorageError> {
    tx.as_any_mut()
        .downcast_mut::<MemoryTransaction>()
        .map(|t| &mut t.staged)
        .ok_or_else(|| StorageError::Internal("transaction handle belongs to another backend".to_string()))
}

/// Apply `op` now, or when the transaction commits.
async fn write(
    tables: &RwLock<Tables>,
    tx: Tx<'_>,
    op: impl FnOnce(&mut Tables) + Send + 'static,
) -> Result<(), StorageError> {
    match tx {
        Some(tx) => staging(tx)?.push(Box::new(op)),
        None => op(&mut *tables.write().await),
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TxFactory for MemoryStore {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>, StorageError>> {
        Box::pin(async move {
            Ok(Box::new(MemoryTransaction {
                tables: Arc::clone(&self.tables),
                staged: Vec::new(),
            }) as Box<dyn Transaction>)
        })
    }
}

impl UserRepository for MemoryStore {
    fn create<'a>(&'a self, input: NewUser, tx: Tx<'a>) -> BoxFuture<'a, Result<User, StorageError>> {
        Box::pin(async move {
            let now = jiff::Timestamp::now();
            let user = User {
                id: Uuid::new_v4(),
                email: input.email,
                password: input.password,
                username: input.username,
                is_active: input.is_active,
                role: input.role,
                phone_number: None,
                address: None,
                created_at: now,
                updated_at: now,
            };
            let row = user.clone();
            write(&self.tables, tx, move |t| t.users.push(Row { value: row, deleted: false })).await?;
            Ok(user)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<User, StorageError>> {
        Box::pin(async move { find(&self.tables.read().await.users, id) })
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<User, StorageError>> {
        Box::pin(async move {
            live(&self.tables.read().await.users)
                .find(|u| u.email == email)
                .cloned()
                .ok_or(StorageError::NotFound)
        })
    }

    fn find_by_role(&self, role: Role, limit: i64, offset: i64) -> BoxFuture<'_, Result<Vec<User>, StorageError>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            page(live(&tables.users).filter(|u| u.role == role).collect(), limit, offset)
        })
    }

    fn update<'a>(&'a self, id: Uuid, patch: UserPatch, tx: Tx<'a>) -> BoxFuture<'a, Result<User, StorageError>> {
        Box::pin(async move {
            let mut user = find(&self.tables.read().await.users, id)?;
            if let Some(username) = patch.username {
                user.username = username;
            }
            if let Some(password) = patch.password {
                user.password = password;
            }
            if let Some(is_active) = patch.is_active {
                user.is_active = is_active;
            }
            if let Some(phone) = patch.phone_number {
                user.phone_number = Some(phone);
            }
            if let Some(address) = patch.address {
                user.address = Some(address);
            }
            user.updated_at = jiff::Timestamp::now();

            let row = user.clone();
            write(&self.tables, tx, move |t| replace(&mut t.users, row)).await?;
            Ok(user)
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let row = tables
                .users
                .iter_mut()
                .find(|r| !r.deleted && r.value.id == id)
                .ok_or(StorageError::NotFound)?;
            row.deleted = true;
            Ok(())
        })
    }
}

impl ChildRepository for MemoryStore {
    fn create<'a>(&'a self, input: NewChild, tx: Tx<'a>) -> BoxFuture<'a, Result<Child, StorageError>> {
        Box::pin(async move {
            let now = jiff::Timestamp::now();
            let child = Child {
                id: Uuid::new_v4(),
                parent_user_id: input.parent_user_id,
                date_of_birth: input.date_of_birth,
                gender: input.gender,
                name: input.name,
                guardian_name: input.guardian_name,
                created_at: now,
                updated_at: now,
            };
            let row = child.clone();
            write(&self.tables, tx, move |t| t.children.push(Row { value: row, deleted: false })).await?;
            Ok(child)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Child, StorageError>> {
        Box::pin(async move { find(&self.tables.read().await.children, id) })
    }

    fn search(&self, filter: ChildFilter) -> BoxFuture<'_, Result<Vec<Child>, StorageError>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let needle = filter.name.as_ref().map(|n| n.to_lowercase());
            let matched = live(&tables.children)
                .filter(|c| filter.parent_user_id.is_none_or(|p| c.parent_user_id == p))
                .filter(|c| filter.gender.is_none_or(|g| c.gender == g))
                .filter(|c| {
                    needle
                        .as_ref()
                        .is_none_or(|n| c.name.to_lowercase().contains(n.as_str()))
                })
                .collect();
            page(matched, filter.limit, filter.offset)
        })
    }

    fn update<'a>(&'a self, id: Uuid, patch: ChildPatch, tx: Tx<'a>) -> BoxFuture<'a, Result<Child, StorageError>> {
        Box::pin(async move {
            let mut child = find(&self.tables.read().await.children, id)?;
            if let Some(dob) = patch.date_of_birth {
                child.date_of_birth = dob;
            }
            if let Some(gender) = patch.gender {
                child.gender = gender;
            }
            if let Some(name) = patch.name {
                child.name = name;
            }
            if let Some(guardian) = patch.guardian_name {
                child.guardian_name = Some(guardian);
            }
            child.updated_at = jiff::Timestamp::now();

            let row = child.clone();
            write(&self.tables, tx, move |t| replace(&mut t.children, row)).await?;
            Ok(child)
        })
    }
}

impl PackageRepository for MemoryStore {
    fn create<'a>(&'a self, input: NewPackage, tx: Tx<'a>) -> BoxFuture<'a, Result<Package, StorageError>> {
        Box::pin(async move {
            let now = jiff::Timestamp::now();
            let content = input.content;
            let package = Package {
                id: Uuid::new_v4(),
                created_by: input.created_by,
                name: content.name,
                questionnaire: content.questionnaire,
                indication_categories: content.indication_categories,
                image_result_attribute_key: content.image_result_attribute_key,
                is_active: input.is_active,
                is_locked: false,
                created_at: now,
                updated_at: now,
            };
            let row = package.clone();
            write(&self.tables, tx, move |t| t.packages.push(Row { value: row, deleted: false })).await?;
            Ok(package)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Package, StorageError>> {
        Box::pin(async move { find(&self.tables.read().await.packages, id) })
    }

    fn search(&self, filter: PackageFilter) -> BoxFuture<'_, Result<Vec<Package>, StorageError>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let matched = live(&tables.packages)
                .filter(|p| filter.is_active.is_none_or(|a| p.is_active == a))
                .filter(|p| filter.is_locked.is_none_or(|l| p.is_locked == l))
                .collect();
            page(matched, filter.limit, filter.offset)
        })
    }

    fn find_oldest_active_and_locked(&self) -> BoxFuture<'_, Result<Package, StorageError>> {
        Box::pin(async move {
            live(&self.tables.read().await.packages)
                .find(|p| p.is_active && p.is_locked)
                .cloned()
                .ok_or(StorageError::NotFound)
        })
    }

    fn update<'a>(&'a self, id: Uuid, patch: PackagePatch, tx: Tx<'a>) -> BoxFuture<'a, Result<Package, StorageError>> {
        Box::pin(async move {
            match tx {
                Some(tx) => {
                    let mut preview = find(&self.tables.read().await.packages, id)?;
                    apply_package_patch(&mut preview, patch.clone());
                    staging(tx)?.push(Box::new(move |t| {
                        if let Some(row) = t.packages.iter_mut().find(|r| !r.deleted && r.value.id == id) {
                            apply_package_patch(&mut row.value, patch);
                        }
                    }));
                    Ok(preview)
                }
                None => {
                    let mut tables = self.tables.write().await;
                    let row = tables
                        .packages
                        .iter_mut()
                        .find(|r| !r.deleted && r.value.id == id)
                        .ok_or(StorageError::NotFound)?;
                    apply_package_patch(&mut row.value, patch);
                    Ok(row.value.clone())
                }
            }
        })
    }

    fn mark_locked(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let row = tables
                .packages
                .iter_mut()
                .find(|r| !r.deleted && r.value.id == id)
                .ok_or(StorageError::NotFound)?;
            if !row.value.is_locked {
                row.value.is_locked = true;
                row.value.updated_at = jiff::Timestamp::now();
            }
            Ok(())
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let row = tables
                .packages
                .iter_mut()
                .find(|r| !r.deleted && r.value.id == id)
                .ok_or(StorageError::NotFound)?;
            row.deleted = true;
            Ok(())
        })
    }
}

impl ResultRepository for MemoryStore {
    fn create<'a>(&'a self, input: NewResult, tx: Tx<'a>) -> BoxFuture<'a, Result<QuestionnaireResult, StorageError>> {
        Box::pin(async move {
            let now = jiff::Timestamp::now();
            let result = QuestionnaireResult {
                id: Uuid::new_v4(),
                package_id: input.package_id,
                child_id: input.child_id,
                created_by: input.created_by,
                answer: input.answer,
                result: input.result,
                created_at: now,
                updated_at: now,
            };
            let row = result.clone();
            write(&self.tables, tx, move |t| t.results.push(Row { value: row, deleted: false })).await?;
            Ok(result)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<QuestionnaireResult, StorageError>> {
        Box::pin(async move { find(&self.tables.read().await.results, id) })
    }

    fn search(&self, filter: ResultFilter) -> BoxFuture<'_, Result<Vec<QuestionnaireResult>, StorageError>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let matched = live(&tables.results)
                .filter(|r| filter.id.is_none_or(|id| r.id == id))
                .filter(|r| filter.package_id.is_none_or(|id| r.package_id == id))
                .filter(|r| filter.child_id.is_none_or(|id| r.child_id == Some(id)))
                .filter(|r| filter.created_by.is_none_or(|id| r.created_by == Some(id)))
                .collect();
            page(matched, filter.limit, filter.offset)
        })
    }

    fn find_user_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> BoxFuture<'_, Result<Vec<QuestionnaireResult>, StorageError>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let own_children: Vec<Uuid> = live(&tables.children)
                .filter(|c| c.parent_user_id == user_id)
                .map(|c| c.id)
                .collect();
            let matched = live(&tables.results)
                .filter(|r| {
                    r.created_by == Some(user_id)
                        || r.child_id.is_some_and(|c| own_children.contains(&c))
                })
                .collect();
            page(matched, limit, offset)
        })
    }
}
