//! User service: profiles, invitations and admin account management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    generate_user_code, signup_status, PaginatedResponse, Pagination, PlanType, User, UserRole,
    UserStatus,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::ConnectionService;
use crate::config::AdminConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// User service for profiles and the admin back-office
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Signup input
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileInput {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "crate::validators::indian_mobile")]
    pub phone: Option<String>,
    /// Farmer or dealer; administrators are assigned, never chosen
    pub role: UserRole,
    #[validate(length(min = 1, max = 32))]
    pub invitation_code: Option<String>,
}

/// Dealer invitation for a farmer
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Invitation {
    pub code: String,
    pub dealer_id: Uuid,
    pub email: Option<String>,
    pub accepted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationInput {
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserStatusInput {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanInput {
    pub plan_type: PlanType,
}

const USER_COLUMNS: &str = "id, name, email, phone, role, status, plan_type, unique_code, \
                            connected_farmers, connected_dealers, created_at, updated_at";

/// Invitation codes look like "INV-7C41D09A"
fn generate_invitation_code() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("INV-{}", &hex[..8])
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the profile for an authenticated identity.
    ///
    /// New accounts wait for admin approval, except configured admin emails
    /// and farmers joining through a dealer's invitation, who start active.
    /// An invited farmer is connected to the inviting dealer straight away.
    pub async fn create_profile(
        &self,
        identity: &AuthUser,
        input: CreateProfileInput,
        admin: &AdminConfig,
    ) -> AppResult<User> {
        let email = input.email.trim().to_lowercase();
        let is_auto_admin = admin.is_auto_admin(&email);

        let role = if is_auto_admin {
            UserRole::Admin
        } else if input.role == UserRole::Admin {
            return Err(AppError::Forbidden(
                "The admin role cannot be requested at signup".to_string(),
            ));
        } else {
            input.role
        };

        let mut tx = self.db.begin().await?;

        let invitation = match input.invitation_code.as_deref() {
            Some(code) if !is_auto_admin => {
                let invitation = sqlx::query_as::<_, Invitation>(
                    r#"
                    SELECT code, dealer_id, email, accepted_by, created_at, accepted_at
                    FROM invitations WHERE code = $1 FOR UPDATE
                    "#,
                )
                .bind(code.trim().to_uppercase())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Invitation".to_string()))?;

                if invitation.accepted_by.is_some() {
                    return Err(AppError::Conflict {
                        resource: "invitation_code".to_string(),
                        message: "This invitation has already been used".to_string(),
                    });
                }
                if invitation
                    .email
                    .as_deref()
                    .is_some_and(|invited| !invited.eq_ignore_ascii_case(&email))
                {
                    return Err(AppError::Forbidden(
                        "This invitation was issued for a different email".to_string(),
                    ));
                }
                if role != UserRole::Farmer {
                    return Err(AppError::Validation {
                        field: "role".to_string(),
                        message: "Invitations are for farmers".to_string(),
                    });
                }
                Some(invitation)
            }
            _ => None,
        };

        let status = signup_status(is_auto_admin, invitation.is_some());

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, phone, role, status, plan_type, unique_code)
            VALUES ($1, $2, $3, $4, $5, $6, 'free', $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(identity.user_id)
        .bind(input.name.trim())
        .bind(&email)
        .bind(&input.phone)
        .bind(role)
        .bind(status)
        .bind(generate_user_code(identity.user_id))
        .fetch_one(&mut *tx)
        .await
        .map_err(super::conflict_on_unique("profile", "A profile already exists for this account"))?;

        if let Some(invitation) = &invitation {
            sqlx::query(
                "UPDATE invitations SET accepted_by = $2, accepted_at = NOW() WHERE code = $1",
            )
            .bind(&invitation.code)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO connections (farmer_id, dealer_id, status, requested_by, decided_at)
                VALUES ($1, $2, 'approved', 'dealer', NOW())
                "#,
            )
            .bind(user.id)
            .bind(invitation.dealer_id)
            .execute(&mut *tx)
            .await?;

            ConnectionService::link_in_tx(&mut tx, user.id, invitation.dealer_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            role = user.role.as_str(),
            status = user.status.as_str(),
            invited = invitation.is_some(),
            "Profile created"
        );

        // Re-read so connection arrays reflect the invitation link
        self.get_profile(user.id).await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Resolve a shareable code such as "PM-3F9A1C"
    pub async fn find_by_code(&self, code: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE unique_code = $1 AND deleted_at IS NULL"
        ))
        .bind(code.trim().to_uppercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User with this code".to_string()))
    }

    /// Issue an invitation code a farmer can sign up with
    pub async fn create_invitation(
        &self,
        dealer: &AuthUser,
        input: CreateInvitationInput,
    ) -> AppResult<Invitation> {
        if dealer.role != UserRole::Dealer {
            return Err(AppError::Forbidden("Only dealers can invite farmers".to_string()));
        }

        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (code, dealer_id, email)
            VALUES ($1, $2, $3)
            RETURNING code, dealer_id, email, accepted_by, created_at, accepted_at
            "#,
        )
        .bind(generate_invitation_code())
        .bind(dealer.user_id)
        .bind(input.email.map(|e| e.trim().to_lowercase()))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(dealer_id = %dealer.user_id, code = %invitation.code, "Invitation created");

        Ok(invitation)
    }

    /// Admin listing with optional role/status filters
    pub async fn list_users(&self, filter: &UserFilter) -> AppResult<PaginatedResponse<User>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE deleted_at IS NULL
              AND ($1::user_role IS NULL OR role = $1)
              AND ($2::user_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.role)
        .bind(filter.status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE deleted_at IS NULL
              AND ($1::user_role IS NULL OR role = $1)
              AND ($2::user_status IS NULL OR status = $2)
            "#,
        )
        .bind(filter.role)
        .bind(filter.status)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(users, &pagination, total as u64))
    }

    /// Approve, suspend or reinstate an account
    pub async fn update_user_status(
        &self,
        admin: &AuthUser,
        user_id: Uuid,
        status: UserStatus,
    ) -> AppResult<User> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_scalar::<_, UserStatus>(
            "SELECT status FROM users WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if !current.can_transition_to(status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Invalid user transition: {} -> {}",
                current.as_str(),
                status.as_str()
            )));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            admin_id = %admin.user_id,
            user_id = %user_id,
            from = current.as_str(),
            to = status.as_str(),
            "User status changed"
        );

        Ok(user)
    }

    pub async fn update_plan(
        &self,
        admin: &AuthUser,
        user_id: Uuid,
        plan_type: PlanType,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET plan_type = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(plan_type)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(admin_id = %admin.user_id, user_id = %user_id, plan = ?plan_type, "Plan changed");

        Ok(user)
    }

    /// Retire a profile. The row stays so ledgers, orders and rates keep their
    /// owner; personal details are wiped, the user leaves every connection list
    /// and their open requests are declined. The identity at the auth provider
    /// is managed there.
    pub async fn delete_user(&self, admin: &AuthUser, user_id: Uuid) -> AppResult<()> {
        if admin.user_id == user_id {
            return Err(AppError::Forbidden(
                "Administrators cannot delete their own account".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = 'Deleted user',
                email = 'deleted+' || id::text || '@poultrymitra.invalid',
                phone = NULL,
                status = 'suspended',
                connected_farmers = '{}',
                connected_dealers = '{}',
                deleted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE users
            SET connected_farmers = array_remove(connected_farmers, $1),
                connected_dealers = array_remove(connected_dealers, $1),
                updated_at = NOW()
            WHERE $1 = ANY(connected_farmers) OR $1 = ANY(connected_dealers)
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE connections SET status = 'rejected', decided_at = NOW()
            WHERE (farmer_id = $1 OR dealer_id = $1) AND status = 'pending'
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE orders SET status = 'rejected', decided_at = NOW(), decided_by = $2
            WHERE (farmer_id = $1 OR dealer_id = $1) AND status = 'pending'
            "#,
        )
        .bind(user_id)
        .bind(admin.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::warn!(admin_id = %admin.user_id, user_id = %user_id, "User deleted");

        Ok(())
    }
}


#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::services::ledger::AddEntryInput;
    use crate::services::order::CreateOrderInput;
    use crate::services::test_support::{active_user, connect, dealer_item, dec};
    use crate::services::{LedgerService, OrderService};
    use shared::{EntryType, OrderStatus};

    fn order_of(product_id: Uuid, dealer_id: Uuid, quantity: &str) -> CreateOrderInput {
        CreateOrderInput {
            counterparty_id: dealer_id,
            product_id,
            quantity: dec(quantity),
            rate_per_unit: None,
            notes: None,
        }
    }

    /// Removing a dealer keeps their ledger and order history intact
    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_dealer_keeps_history(pool: PgPool) {
        let admin = active_user(&pool, UserRole::Admin).await;
        let farmer = active_user(&pool, UserRole::Farmer).await;
        let dealer = active_user(&pool, UserRole::Dealer).await;
        connect(&pool, &farmer, &dealer).await;
        let item = dealer_item(&pool, &dealer, "Broiler Starter Feed", "50", "1450").await;

        let orders = OrderService::new(pool.clone());
        let settled = orders
            .create_order(&farmer, order_of(item.id, dealer.user_id, "10"))
            .await
            .unwrap();
        orders
            .update_order_status(settled.id, OrderStatus::Approved, &dealer)
            .await
            .unwrap();
        let open = orders
            .create_order(&farmer, order_of(item.id, dealer.user_id, "5"))
            .await
            .unwrap();

        let ledger = LedgerService::new(pool.clone());
        ledger
            .add_entry(
                dealer.user_id,
                AddEntryInput {
                    description: "Transport".to_string(),
                    amount: dec("500"),
                    entry_type: EntryType::Debit,
                    entry_date: None,
                    client_reference: None,
                },
            )
            .await
            .unwrap();

        let users = UserService::new(pool.clone());
        users.delete_user(&admin, dealer.user_id).await.unwrap();

        assert!(matches!(users.get_profile(dealer.user_id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            users.find_by_code(&generate_user_code(dealer.user_id)).await,
            Err(AppError::NotFound(_))
        ));

        let report = ledger.verify_chain(dealer.user_id).await.unwrap();
        assert!(report.valid);
        assert_eq!(report.entries_checked, 2);
        assert_eq!(report.final_balance, Some(dec("14000")));

        let settled = orders.get_order(&admin, settled.id).await.unwrap();
        assert_eq!(settled.status, OrderStatus::Approved);
        let open = orders.get_order(&admin, open.id).await.unwrap();
        assert_eq!(open.status, OrderStatus::Rejected);
        assert_eq!(open.decided_by, Some(admin.user_id));

        let farmer_profile = users.get_profile(farmer.user_id).await.unwrap();
        assert!(farmer_profile.connected_dealers.is_empty());
        assert!(!ConnectionService::new(pool)
            .is_connected(farmer.user_id, dealer.user_id)
            .await
            .unwrap());

        let again = users.delete_user(&admin, dealer.user_id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deleted_profile_wiped_from_listing(pool: PgPool) {
        let admin = active_user(&pool, UserRole::Admin).await;
        let farmer = active_user(&pool, UserRole::Farmer).await;
        let users = UserService::new(pool.clone());

        users.delete_user(&admin, farmer.user_id).await.unwrap();

        let listed = users
            .list_users(&UserFilter {
                role: Some(UserRole::Farmer),
                status: None,
                page: None,
                per_page: None,
            })
            .await
            .unwrap();
        assert!(listed.data.iter().all(|u| u.id != farmer.user_id));

        let (name, email, phone) = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT name, email, phone FROM users WHERE id = $1",
        )
        .bind(farmer.user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(name, "Deleted user");
        assert!(email.ends_with("@poultrymitra.invalid"));
        assert!(phone.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_admin_cannot_delete_self(pool: PgPool) {
        let admin = active_user(&pool, UserRole::Admin).await;
        let result = UserService::new(pool).delete_user(&admin, admin.user_id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
