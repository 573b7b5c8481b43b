use anyhow::Result;
use rusqlite::Connection;
use tracing::info;
use treadify_types::{Permission, Role};

/// Seeded role → permission grants. This is the only place the mapping lives;
/// the authorizer reads it back through `role_permissions_view`.
pub const GRANTS: &[(Role, &[Permission])] = &[
    (
        Role::ProductManager,
        &[
            Permission::CreateProductChannel,
            Permission::AddFeature,
            Permission::DeprecateChannel,
            Permission::UpdateDeadline,
            Permission::GenerateJoinCode,
            Permission::ViewProductReport,
            Permission::ViewFeatureProgress,
        ],
    ),
    (
        Role::TechnicalLead,
        &[
            Permission::GenerateJoinCode,
            Permission::ViewFeatureProgress,
            Permission::CreateGoal,
            Permission::CompleteGoal,
            Permission::ReviewCommit,
            Permission::SubmitCommit,
        ],
    ),
    (Role::Developer, &[Permission::SubmitCommit]),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
            r.get(0)
        })?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE roles (
                id      INTEGER PRIMARY KEY,
                name    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE permissions (
                id      INTEGER PRIMARY KEY,
                name    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE role_permissions (
                role_id         INTEGER NOT NULL REFERENCES roles(id),
                permission_id   INTEGER NOT NULL REFERENCES permissions(id),
                PRIMARY KEY (role_id, permission_id)
            );

            CREATE VIEW role_permissions_view AS
                SELECT r.name AS role_name, p.name AS permission_name
                FROM role_permissions rp
                JOIN roles r ON r.id = rp.role_id
                JOIN permissions p ON p.id = rp.permission_id;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL,
                password    TEXT NOT NULL,
                role_id     INTEGER REFERENCES roles(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE user_github_integrations (
                user_id         TEXT PRIMARY KEY REFERENCES users(id),
                github_username TEXT NOT NULL,
                access_token    TEXT NOT NULL,
                linked_at       TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE products (
                id          TEXT PRIMARY KEY,
                pm_id       TEXT NOT NULL REFERENCES users(id),
                name        TEXT NOT NULL,
                description TEXT,
                deadline    TEXT,
                status      TEXT NOT NULL DEFAULT 'active'
                            CHECK (status IN ('active', 'deprecated')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE product_repositories (
                product_id      TEXT PRIMARY KEY REFERENCES products(id),
                owner           TEXT NOT NULL,
                name            TEXT NOT NULL,
                url             TEXT NOT NULL,
                default_branch  TEXT NOT NULL
            );

            CREATE TABLE features (
                id              TEXT PRIMARY KEY,
                product_id      TEXT NOT NULL REFERENCES products(id),
                name            TEXT NOT NULL,
                description     TEXT,
                deadline        TEXT,
                tech_lead_id    TEXT REFERENCES users(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_features_product ON features(product_id);

            CREATE TABLE channels (
                id          TEXT PRIMARY KEY,
                product_id  TEXT NOT NULL REFERENCES products(id),
                feature_id  TEXT REFERENCES features(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- One product-level channel (feature_id NULL) and one channel per feature
            CREATE UNIQUE INDEX idx_channels_scope
                ON channels(product_id, COALESCE(feature_id, ''));

            CREATE TABLE channel_members (
                channel_id  TEXT NOT NULL REFERENCES channels(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                joined_at   TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (channel_id, user_id)
            );

            CREATE INDEX idx_channel_members_user ON channel_members(user_id);

            CREATE TABLE channel_invites (
                code        TEXT NOT NULL UNIQUE,
                channel_id  TEXT NOT NULL REFERENCES channels(id),
                created_by  TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE goals (
                id              TEXT PRIMARY KEY,
                feature_id      TEXT NOT NULL REFERENCES features(id),
                title           TEXT NOT NULL,
                description     TEXT,
                status          TEXT NOT NULL DEFAULT 'open'
                                CHECK (status IN ('open', 'completed')),
                created_by      TEXT NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                completed_at    TEXT
            );

            CREATE INDEX idx_goals_feature ON goals(feature_id);

            CREATE TABLE commits (
                id              TEXT PRIMARY KEY,
                goal_id         TEXT NOT NULL REFERENCES goals(id),
                author_id       TEXT NOT NULL REFERENCES users(id),
                message         TEXT NOT NULL,
                sha             TEXT,
                url             TEXT,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'approved', 'rejected')),
                reviewer_id     TEXT REFERENCES users(id),
                review_comment  TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                reviewed_at     TEXT
            );

            CREATE INDEX idx_commits_goal ON commits(goal_id);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                channel_id  TEXT NOT NULL REFERENCES channels(id),
                sender_id   TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_channel ON messages(channel_id, created_at);

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                data        TEXT NOT NULL,
                expiry_date INTEGER NOT NULL
            );

            CREATE INDEX idx_sessions_expiry ON sessions(expiry_date);
            ",
        )?;

        seed_grants(conn)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    }

    info!("Database migrations complete");
    Ok(())
}

fn seed_grants(conn: &Connection) -> Result<()> {
    for role in Role::ALL {
        conn.execute("INSERT INTO roles (name) VALUES (?1)", [role.as_str()])?;
    }
    for permission in Permission::ALL {
        conn.execute("INSERT INTO permissions (name) VALUES (?1)", [permission.as_str()])?;
    }
    for (role, permissions) in GRANTS {
        for permission in *permissions {
            conn.execute(
                "INSERT INTO role_permissions (role_id, permission_id)
                 SELECT r.id, p.id FROM roles r, permissions p
                 WHERE r.name = ?1 AND p.name = ?2",
                [role.as_str(), permission.as_str()],
            )?;
        }
    }
    Ok(())
}
