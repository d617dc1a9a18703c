//! Package authoring and integrity.
//!
//! Every mutation holds the package lease `lock:pkg:<id>` and the active
//! list lease `lock:all-active-packages` across the database write and the
//! cache update, and re-reads the row under the lease before checking
//! `is_locked`. Leases are always taken package first. Reads go through
//! [`CacheKeeper::get_or_lock`] on the same keys, so a reader never caches a
//! snapshot older than a write that finished before it.

use std::sync::Arc;
use std::time::Duration;

use atec_cache::locker::DEFAULT_EXPIRY;
use atec_cache::{CacheKeeper, CacheLookup, Lease};
use atec_core::cache_keys;
use atec_core::error::ServiceError;
use atec_core::models::package::{Package, PackageContent, Questionnaire};
use atec_core::principal::Requester;
use atec_storage::StorageError;
use atec_storage::repository::{NewPackage, PackageFilter, PackagePatch, PackageRepository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::require_admin;

pub const MSG_PACKAGE_LOCKED: &str = "package is already locked";
pub const MSG_NO_ACTIVE_PACKAGE: &str = "system still doesn't have any questionnaire to be used yet";

const WRITE_LEASE_TRIES: u32 = 3;
const MARK_LOCKED_LEASE_TRIES: u32 = 20;
const ACTIVE_LIST_LIMIT: i64 = 1000;

#[derive(Debug, Clone)]
pub struct PackageCacheSettings {
    pub package_ttl: Duration,
    pub all_active_ttl: Duration,
}

impl Default for PackageCacheSettings {
    fn default() -> Self {
        Self {
            package_ttl: Duration::from_secs(3600),
            all_active_ttl: Duration::from_secs(600),
        }
    }
}

/// What a respondent needs to fill in a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePackage {
    pub id: Uuid,
    pub name: String,
    pub questionnaire: Questionnaire,
}

impl From<Package> for ActivePackage {
    fn from(p: Package) -> Self {
        Self {
            id: p.id,
            name: p.name,
            questionnaire: p.questionnaire,
        }
    }
}

#[derive(Clone)]
pub struct PackageService {
    packages: Arc<dyn PackageRepository>,
    cache: CacheKeeper,
    settings: PackageCacheSettings,
}

impl PackageService {
    pub fn new(packages: Arc<dyn PackageRepository>, cache: CacheKeeper, settings: PackageCacheSettings) -> Self {
        Self {
            packages,
            cache,
            settings,
        }
    }

    /// New packages start inactive and unlocked.
    pub async fn create(&self, requester: &Requester, content: PackageContent) -> Result<Uuid, ServiceError> {
        let admin = require_admin(requester)?;
        validate(&content)?;

        let package = self
            .packages
            .create(
                NewPackage {
                    created_by: admin.user_id,
                    content,
                    is_active: false,
                },
                None,
            )
            .await?;

        match self.lease(package.id, 1).await {
            Ok(lease) => {
                self.store_snapshot(&package).await;
                release(lease).await;
            }
            Err(_) => warn!(package_id = %package.id, "package lease busy, skipping cache warmup"),
        }

        info!(package_id = %package.id, created_by = %admin.user_id, "package created");
        Ok(package.id)
    }

    /// Replace the content of an unlocked package.
    pub async fn update(&self, requester: &Requester, id: Uuid, content: PackageContent) -> Result<(), ServiceError> {
        require_admin(requester)?;
        validate(&content)?;

        let leases = self.write_leases(id, WRITE_LEASE_TRIES).await?;
        let outcome: Result<(), ServiceError> = async {
            let current = self.packages.find_by_id(id).await?;
            if current.is_locked {
                return Err(ServiceError::Forbidden(MSG_PACKAGE_LOCKED.to_string()));
            }
            let updated = self
                .packages
                .update(
                    id,
                    PackagePatch {
                        content: Some(content),
                        is_active: None,
                    },
                    None,
                )
                .await?;
            self.store_snapshot(&updated).await;
            self.drop_active_list().await;
            Ok(())
        }
        .await;
        leases.release().await;
        outcome
    }

    /// Activating is always allowed; deactivating a locked package is not.
    pub async fn change_active_status(&self, requester: &Requester, id: Uuid, is_active: bool) -> Result<(), ServiceError> {
        require_admin(requester)?;

        let leases = self.write_leases(id, WRITE_LEASE_TRIES).await?;
        let outcome: Result<(), ServiceError> = async {
            let current = self.packages.find_by_id(id).await?;
            if current.is_active == is_active {
                return Ok(());
            }
            if current.is_locked && !is_active {
                return Err(ServiceError::Forbidden(MSG_PACKAGE_LOCKED.to_string()));
            }
            let updated = self
                .packages
                .update(
                    id,
                    PackagePatch {
                        content: None,
                        is_active: Some(is_active),
                    },
                    None,
                )
                .await?;
            self.store_snapshot(&updated).await;
            self.drop_active_list().await;
            info!(package_id = %id, is_active, "package active status changed");
            Ok(())
        }
        .await;
        leases.release().await;
        outcome
    }

    /// Soft delete. Locked packages are kept forever.
    pub async fn delete(&self, requester: &Requester, id: Uuid) -> Result<(), ServiceError> {
        require_admin(requester)?;

        let leases = self.write_leases(id, WRITE_LEASE_TRIES).await?;
        let outcome: Result<(), ServiceError> = async {
            let current = self.packages.find_by_id(id).await?;
            if current.is_locked {
                return Err(ServiceError::Forbidden(MSG_PACKAGE_LOCKED.to_string()));
            }
            self.packages.delete(id).await?;
            if let Err(e) = self.cache.set_nil(&cache_keys::package(id), None).await {
                warn!(error = %e, package_id = %id, "failed to memoize deleted package");
            }
            self.drop_active_list().await;
            info!(package_id = %id, "package deleted");
            Ok(())
        }
        .await;
        leases.release().await;
        outcome
    }

    /// Read-through lookup. Absence is memoized with the NIL sentinel.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Package, ServiceError> {
        let key = cache_keys::package(id);
        match self.cache.get_or_lock(&key).await? {
            CacheLookup::Hit(raw) => match serde_json::from_str::<Package>(&raw) {
                Ok(package) => Ok(package),
                Err(e) => {
                    warn!(error = %e, package_id = %id, "unreadable package snapshot, reading database");
                    Ok(self.packages.find_by_id(id).await?)
                }
            },
            CacheLookup::Nil => Err(ServiceError::not_found()),
            CacheLookup::Leased(lease) => {
                let outcome = self.load_package(&key, id).await;
                release(lease).await;
                outcome
            }
        }
    }

    /// All active packages, cached as a single entry.
    pub async fn find_active(&self) -> Result<Vec<ActivePackage>, ServiceError> {
        let key = cache_keys::ALL_ACTIVE_PACKAGES;
        let packages = match self.cache.get_or_lock(key).await? {
            CacheLookup::Hit(raw) => match serde_json::from_str::<Vec<Package>>(&raw) {
                Ok(packages) => packages,
                Err(e) => {
                    warn!(error = %e, "unreadable active package list, reading database");
                    self.search_active().await?
                }
            },
            CacheLookup::Nil => return Err(no_active_package()),
            CacheLookup::Leased(lease) => {
                let outcome = self.load_active_list(key).await;
                release(lease).await;
                outcome?
            }
        };
        Ok(packages.into_iter().map(ActivePackage::from).collect())
    }

    pub async fn find_oldest_active_and_locked(&self) -> Result<Package, ServiceError> {
        Ok(self.packages.find_oldest_active_and_locked().await?)
    }

    /// Freeze a package once a result references it. Safe to repeat.
    pub async fn mark_locked(&self, id: Uuid) -> Result<(), ServiceError> {
        let leases = self.write_leases(id, MARK_LOCKED_LEASE_TRIES).await?;
        let outcome: Result<(), ServiceError> = async {
            self.packages.mark_locked(id).await?;
            if let Err(e) = self.cache.del(&cache_keys::package(id)).await {
                warn!(error = %e, package_id = %id, "failed to drop package snapshot after locking");
            }
            self.drop_active_list().await;
            debug!(package_id = %id, "package locked");
            Ok(())
        }
        .await;
        leases.release().await;
        outcome
    }

    /// Seed the built-in package as active when nothing is active yet.
    pub async fn ensure_default_package(&self, created_by: Uuid) -> Result<Option<Uuid>, ServiceError> {
        match self.search_active().await {
            Ok(_) => return Ok(None),
            Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let list_lease = self.active_list_lease(WRITE_LEASE_TRIES).await?;
        let outcome = self
            .packages
            .create(
                NewPackage {
                    created_by,
                    content: atec_grader::default_package::default_content(),
                    is_active: true,
                },
                None,
            )
            .await;
        if outcome.is_ok() {
            self.drop_active_list().await;
        }
        release(list_lease).await;

        let package = outcome?;
        info!(package_id = %package.id, "default package seeded");
        Ok(Some(package.id))
    }

    async fn load_package(&self, key: &str, id: Uuid) -> Result<Package, ServiceError> {
        match self.packages.find_by_id(id).await {
            Ok(package) => {
                if let Err(e) = self.cache.set_json(key, &package, self.settings.package_ttl).await {
                    warn!(error = %e, package_id = %id, "failed to cache package");
                }
                Ok(package)
            }
            Err(StorageError::NotFound) => {
                if let Err(e) = self.cache.set_nil(key, None).await {
                    warn!(error = %e, package_id = %id, "failed to memoize missing package");
                }
                Err(ServiceError::not_found())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load_active_list(&self, key: &str) -> Result<Vec<Package>, ServiceError> {
        match self.search_active().await {
            Ok(packages) => {
                if let Err(e) = self.cache.set_json(key, &packages, self.settings.all_active_ttl).await {
                    warn!(error = %e, "failed to cache active package list");
                }
                Ok(packages)
            }
            Err(ServiceError::NotFound(_)) => {
                if let Err(e) = self.cache.set_nil(key, None).await {
                    warn!(error = %e, "failed to memoize empty active package list");
                }
                Err(no_active_package())
            }
            Err(e) => Err(e),
        }
    }

    async fn search_active(&self) -> Result<Vec<Package>, ServiceError> {
        self.packages
            .search(PackageFilter {
                is_active: Some(true),
                is_locked: None,
                limit: ACTIVE_LIST_LIMIT,
                offset: 0,
            })
            .await
            .map_err(|e| match e {
                StorageError::NotFound => no_active_package(),
                other => other.into(),
            })
    }

    async fn store_snapshot(&self, package: &Package) {
        let key = cache_keys::package(package.id);
        if let Err(e) = self.cache.set_json(&key, package, self.settings.package_ttl).await {
            warn!(error = %e, package_id = %package.id, "failed to cache package, dropping stale entry");
            if let Err(e) = self.cache.del(&key).await {
                warn!(error = %e, package_id = %package.id, "failed to drop package snapshot");
            }
        }
    }

    /// Caller must hold the active list lease.
    async fn drop_active_list(&self) {
        if let Err(e) = self.cache.del(cache_keys::ALL_ACTIVE_PACKAGES).await {
            warn!(error = %e, "failed to invalidate active package list");
        }
    }

    async fn write_leases(&self, id: Uuid, tries: u32) -> Result<WriteLeases, ServiceError> {
        let package = self.lease(id, tries).await?;
        match self.active_list_lease(tries).await {
            Ok(active_list) => Ok(WriteLeases { package, active_list }),
            Err(e) => {
                release(package).await;
                Err(e)
            }
        }
    }

    async fn active_list_lease(&self, tries: u32) -> Result<Lease, ServiceError> {
        self.cache
            .locker()
            .acquire(cache_keys::ALL_ACTIVE_PACKAGES, DEFAULT_EXPIRY, tries)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to acquire active package list lease");
                ServiceError::internal()
            })
    }

    async fn lease(&self, id: Uuid, tries: u32) -> Result<Lease, ServiceError> {
        self.cache
            .locker()
            .acquire(&cache_keys::package(id), DEFAULT_EXPIRY, tries)
            .await
            .map_err(|e| {
                warn!(error = %e, package_id = %id, "failed to acquire package lease");
                ServiceError::internal()
            })
    }
}

/// Both leases a package write holds, released in reverse order.
struct WriteLeases {
    package: Lease,
    active_list: Lease,
}

impl WriteLeases {
    async fn release(self) {
        release(self.active_list).await;
        release(self.package).await;
    }
}

fn validate(content: &PackageContent) -> Result<(), ServiceError> {
    atec_grader::validate_content(content).map_err(|e| ServiceError::BadRequest(e.to_string()))
}

fn no_active_package() -> ServiceError {
    ServiceError::NotFound(MSG_NO_ACTIVE_PACKAGE.to_string())
}

pub(crate) async fn release(lease: Lease) {
    if let Err(e) = lease.release().await {
        warn!(error = %e, "failed to release lease");
    }
}
