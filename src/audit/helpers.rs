//! Per-action audit helpers.
//!
//! Each helper pins the event name, category, severity, result and target
//! type for one class of action so callers cannot mis-tag it.

use super::entry::{Actor, AuditEntry, Category, Severity, Target};
use super::logger::AuditLogger;
use super::sanitize::{is_sensitive_key, REDACTED};

fn entry(event: &str, category: Category, severity: Severity, actor: Actor) -> AuditEntry {
    AuditEntry::new(event, category, severity, actor)
}

fn target(kind: &str, id: &str, name: &str) -> Target {
    Target::new(kind, id, name)
}

// Authentication

impl AuditLogger {
    pub fn login_success(&self, actor: Actor) -> AuditEntry {
        self.log(entry("auth.login", Category::Authentication, Severity::Info, actor))
    }

    /// Failed authentication is always `warn` with result `failure`.
    pub fn login_failed(&self, actor: Actor, reason: &str) -> AuditEntry {
        self.log(
            entry("auth.login_failed", Category::Authentication, Severity::Warn, actor)
                .failed(reason),
        )
    }

    pub fn logout(&self, actor: Actor) -> AuditEntry {
        self.log(entry("auth.logout", Category::Authentication, Severity::Info, actor))
    }

    pub fn two_factor_enabled(&self, actor: Actor) -> AuditEntry {
        self.log(entry("auth.2fa_enabled", Category::Authentication, Severity::Info, actor))
    }

    /// Turning off a second factor is always `critical`.
    pub fn two_factor_disabled(&self, actor: Actor) -> AuditEntry {
        self.log(entry(
            "auth.2fa_disabled",
            Category::Authentication,
            Severity::Critical,
            actor,
        ))
    }

    pub fn password_changed(&self, actor: Actor) -> AuditEntry {
        self.log(entry(
            "auth.password_changed",
            Category::Authentication,
            Severity::Warn,
            actor,
        ))
    }

    pub fn session_expired(&self, actor: Actor) -> AuditEntry {
        self.log(entry(
            "auth.session_expired",
            Category::Authentication,
            Severity::Info,
            actor,
        ))
    }
}

// Admin lifecycle

impl AuditLogger {
    pub fn admin_created(&self, actor: Actor, admin_id: &str, username: &str) -> AuditEntry {
        self.log(
            entry("admin.created", Category::Admin, Severity::Warn, actor)
                .with_target(target("admin", admin_id, username)),
        )
    }

    pub fn admin_deleted(&self, actor: Actor, admin_id: &str, username: &str) -> AuditEntry {
        self.log(
            entry("admin.deleted", Category::Admin, Severity::Critical, actor)
                .with_target(target("admin", admin_id, username)),
        )
    }

    pub fn admin_role_changed(
        &self,
        actor: Actor,
        admin_id: &str,
        username: &str,
        old_role: &str,
        new_role: &str,
    ) -> AuditEntry {
        self.log(
            entry("admin.role_changed", Category::Admin, Severity::Critical, actor)
                .with_target(target("admin", admin_id, username))
                .with_detail("old_role", old_role)
                .with_detail("new_role", new_role),
        )
    }
}

// User lifecycle

impl AuditLogger {
    pub fn user_created(&self, actor: Actor, user_id: &str, username: &str) -> AuditEntry {
        self.log(
            entry("user.created", Category::Users, Severity::Info, actor)
                .with_target(target("user", user_id, username)),
        )
    }

    /// `changed` lists the updated attribute names.
    pub fn user_updated(
        &self,
        actor: Actor,
        user_id: &str,
        username: &str,
        changed: &[&str],
    ) -> AuditEntry {
        self.log(
            entry("user.updated", Category::Users, Severity::Info, actor)
                .with_target(target("user", user_id, username))
                .with_detail("changed", changed.join(",")),
        )
    }

    pub fn user_deleted(&self, actor: Actor, user_id: &str, username: &str) -> AuditEntry {
        self.log(
            entry("user.deleted", Category::Users, Severity::Warn, actor)
                .with_target(target("user", user_id, username)),
        )
    }

    pub fn user_suspended(
        &self,
        actor: Actor,
        user_id: &str,
        username: &str,
        reason: &str,
    ) -> AuditEntry {
        self.log(
            entry("user.suspended", Category::Users, Severity::Warn, actor)
                .with_target(target("user", user_id, username))
                .with_reason(reason),
        )
    }

    pub fn user_reactivated(&self, actor: Actor, user_id: &str, username: &str) -> AuditEntry {
        self.log(
            entry("user.reactivated", Category::Users, Severity::Info, actor)
                .with_target(target("user", user_id, username)),
        )
    }
}

// Organization lifecycle

impl AuditLogger {
    pub fn organization_created(&self, actor: Actor, org_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("org.created", Category::Organization, Severity::Info, actor)
                .with_target(target("organization", org_id, name)),
        )
    }

    pub fn organization_updated(&self, actor: Actor, org_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("org.updated", Category::Organization, Severity::Info, actor)
                .with_target(target("organization", org_id, name)),
        )
    }

    pub fn organization_deleted(&self, actor: Actor, org_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("org.deleted", Category::Organization, Severity::Critical, actor)
                .with_target(target("organization", org_id, name)),
        )
    }

    pub fn member_added(
        &self,
        actor: Actor,
        org_id: &str,
        name: &str,
        member: &str,
        role: &str,
    ) -> AuditEntry {
        self.log(
            entry("org.member_added", Category::Organization, Severity::Info, actor)
                .with_target(target("organization", org_id, name))
                .with_detail("member", member)
                .with_detail("role", role),
        )
    }

    pub fn member_removed(&self, actor: Actor, org_id: &str, name: &str, member: &str) -> AuditEntry {
        self.log(
            entry("org.member_removed", Category::Organization, Severity::Warn, actor)
                .with_target(target("organization", org_id, name))
                .with_detail("member", member),
        )
    }
}

// Configuration

impl AuditLogger {
    pub fn config_changed(
        &self,
        actor: Actor,
        section: &str,
        setting: &str,
        old_value: &str,
        new_value: &str,
    ) -> AuditEntry {
        let (old_value, new_value) = if is_sensitive_key(setting) {
            (REDACTED, REDACTED)
        } else {
            (old_value, new_value)
        };
        self.log(
            entry("config.changed", Category::Configuration, Severity::Warn, actor)
                .with_target(target("config", section, setting))
                .with_detail("setting", setting)
                .with_detail("old_value", old_value)
                .with_detail("new_value", new_value),
        )
    }
}

// Security incidents

impl AuditLogger {
    pub fn ip_blocked(&self, actor: Actor, ip: &str, reason: &str) -> AuditEntry {
        self.log(
            entry("security.ip_blocked", Category::Security, Severity::Warn, actor)
                .with_target(target("ip", ip, ip))
                .with_reason(reason),
        )
    }

    pub fn brute_force_detected(&self, ip: &str, username: &str, attempts: u32) -> AuditEntry {
        self.log(
            entry(
                "security.brute_force",
                Category::Security,
                Severity::Critical,
                Actor::anonymous(ip),
            )
            .with_target(target("user", "", username))
            .with_detail("attempts", attempts)
            .failed("too many failed attempts"),
        )
    }

    pub fn permission_denied(&self, actor: Actor, resource: &str, action: &str) -> AuditEntry {
        self.log(
            entry("security.permission_denied", Category::Security, Severity::Warn, actor)
                .with_target(target("resource", "", resource))
                .with_detail("action", action)
                .failed("permission denied"),
        )
    }

    pub fn suspicious_activity(&self, actor: Actor, description: &str) -> AuditEntry {
        self.log(
            entry("security.suspicious", Category::Security, Severity::Error, actor)
                .with_reason(description),
        )
    }
}

// Token lifecycle

impl AuditLogger {
    pub fn token_created(&self, actor: Actor, token_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("token.created", Category::Tokens, Severity::Info, actor)
                .with_target(target("token", token_id, name)),
        )
    }

    pub fn token_revoked(&self, actor: Actor, token_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("token.revoked", Category::Tokens, Severity::Warn, actor)
                .with_target(target("token", token_id, name)),
        )
    }

    pub fn token_expired(&self, token_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("token.expired", Category::Tokens, Severity::Info, Actor::system())
                .with_target(target("token", token_id, name)),
        )
    }
}

// Backup and restore

impl AuditLogger {
    pub fn backup_created(&self, actor: Actor, backup_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("backup.created", Category::Backup, Severity::Info, actor)
                .with_target(target("backup", backup_id, name)),
        )
    }

    pub fn backup_failed(&self, actor: Actor, name: &str, error: &str) -> AuditEntry {
        self.log(
            entry("backup.failed", Category::Backup, Severity::Error, actor)
                .with_target(target("backup", "", name))
                .failed(error),
        )
    }

    pub fn restore_started(&self, actor: Actor, backup_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("restore.started", Category::Backup, Severity::Warn, actor)
                .with_target(target("backup", backup_id, name)),
        )
    }

    pub fn restore_completed(&self, actor: Actor, backup_id: &str, name: &str) -> AuditEntry {
        self.log(
            entry("restore.completed", Category::Backup, Severity::Warn, actor)
                .with_target(target("backup", backup_id, name)),
        )
    }

    pub fn restore_failed(&self, actor: Actor, backup_id: &str, name: &str, error: &str) -> AuditEntry {
        self.log(
            entry("restore.failed", Category::Backup, Severity::Critical, actor)
                .with_target(target("backup", backup_id, name))
                .failed(error),
        )
    }
}

// Server lifecycle and scheduled tasks

impl AuditLogger {
    pub fn server_started(&self, version: &str) -> AuditEntry {
        self.log(
            entry("system.started", Category::System, Severity::Info, Actor::system())
                .with_detail("version", version),
        )
    }

    pub fn server_stopped(&self, reason: &str) -> AuditEntry {
        self.log(
            entry("system.stopped", Category::System, Severity::Info, Actor::system())
                .with_reason(reason),
        )
    }

    pub fn config_reloaded(&self, actor: Actor) -> AuditEntry {
        self.log(entry(
            "system.config_reloaded",
            Category::System,
            Severity::Info,
            actor,
        ))
    }

    pub fn task_completed(&self, task: &str, duration_ms: u64) -> AuditEntry {
        self.log(
            entry("task.completed", Category::System, Severity::Info, Actor::system())
                .with_target(target("task", "", task))
                .with_detail("duration_ms", i64::try_from(duration_ms).unwrap_or(i64::MAX)),
        )
    }

    pub fn task_failed(&self, task: &str, error: &str) -> AuditEntry {
        self.log(
            entry("task.failed", Category::System, Severity::Error, Actor::system())
                .with_target(target("task", "", task))
                .failed(error),
        )
    }
}

// Cluster membership

impl AuditLogger {
    pub fn node_joined(&self, node_id: &str, address: &str) -> AuditEntry {
        self.log(
            entry("cluster.node_joined", Category::Cluster, Severity::Info, Actor::system())
                .with_target(target("node", node_id, address)),
        )
    }

    pub fn node_left(&self, node_id: &str, address: &str, reason: &str) -> AuditEntry {
        self.log(
            entry("cluster.node_left", Category::Cluster, Severity::Warn, Actor::system())
                .with_target(target("node", node_id, address))
                .with_reason(reason),
        )
    }

    pub fn leader_changed(&self, old_leader: &str, new_leader: &str) -> AuditEntry {
        self.log(
            entry(
                "cluster.leader_changed",
                Category::Cluster,
                Severity::Warn,
                Actor::system(),
            )
            .with_target(target("node", new_leader, new_leader))
            .with_detail("previous_leader", old_leader),
        )
    }
}
