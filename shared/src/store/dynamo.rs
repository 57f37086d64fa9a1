use super::Store;
use crate::error::ApiError;
use crate::field_options::{FieldName, StoredOptions};
use crate::types::{
    name_key, Church, Invite, InviteStatus, Pastor, PastorFunction, Role, Status, User,
};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::str::FromStr;

type Item = HashMap<String, AttributeValue>;

// Single-table layout. Directory records share one partition per entity type
// so listing is a single paginated query.
const PASTORS_PK: &str = "DIRECTORY#PASTORS";
const CHURCHES_PK: &str = "DIRECTORY#CHURCHES";
const USERS_PK: &str = "DIRECTORY#USERS";
const FIELD_OPTIONS_PK: &str = "FIELD_OPTIONS";

/// DynamoDB-backed store.
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Query one partition by sort-key prefix, following pagination. Reads are
    /// strongly consistent so a lookup sees writes made earlier in the request.
    async fn query_partition(
        &self,
        pk: &str,
        sk_prefix: &str,
        filter: Option<(&str, &str, AttributeValue)>,
    ) -> Result<Vec<Item>, ApiError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .consistent_read(true)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(pk.to_string()))
                .expression_attribute_values(
                    ":sk_prefix",
                    AttributeValue::S(sk_prefix.to_string()),
                )
                .set_exclusive_start_key(start_key.take());

            if let Some((expression, placeholder, value)) = &filter {
                request = request
                    .filter_expression(*expression)
                    .expression_attribute_values(*placeholder, value.clone());
            }

            let result = request.send().await.map_err(store_error)?;
            items.extend(result.items().iter().cloned());

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, ApiError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .consistent_read(true)
            .key("PK", AttributeValue::S(pk.to_string()))
            .key("SK", AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(store_error)?;
        Ok(result.item().cloned())
    }

    async fn put(&self, item: Item) -> Result<(), ApiError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), ApiError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.to_string()))
            .key("SK", AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

fn store_error<E>(err: E) -> ApiError
where
    E: std::error::Error + 'static,
{
    let message = DisplayErrorContext(err).to_string();
    tracing::error!("DynamoDB request failed: {}", message);
    ApiError::Store(message)
}

#[async_trait]
impl Store for DynamoStore {
    async fn list_pastors(&self) -> Result<Vec<Pastor>, ApiError> {
        let items = self.query_partition(PASTORS_PK, "PASTOR#", None).await?;
        Ok(items.iter().filter_map(item_to_pastor).collect())
    }

    async fn get_pastor(&self, id: &str) -> Result<Option<Pastor>, ApiError> {
        let item = self.get(PASTORS_PK, &format!("PASTOR#{}", id)).await?;
        Ok(item.as_ref().and_then(item_to_pastor))
    }

    async fn find_pastors_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Vec<Pastor>, ApiError> {
        let filter = (
            "name_key = :name_key",
            ":name_key",
            AttributeValue::S(name_key(first_name, last_name)),
        );
        let items = self
            .query_partition(PASTORS_PK, "PASTOR#", Some(filter))
            .await?;
        Ok(items.iter().filter_map(item_to_pastor).collect())
    }

    async fn put_pastor(&self, pastor: &Pastor) -> Result<(), ApiError> {
        self.put(pastor_to_item(pastor)).await
    }

    async fn delete_pastor(&self, id: &str) -> Result<(), ApiError> {
        self.delete(PASTORS_PK, &format!("PASTOR#{}", id)).await
    }

    async fn list_churches(&self) -> Result<Vec<Church>, ApiError> {
        let items = self.query_partition(CHURCHES_PK, "CHURCH#", None).await?;
        Ok(items.iter().filter_map(item_to_church).collect())
    }

    async fn get_church(&self, id: &str) -> Result<Option<Church>, ApiError> {
        let item = self.get(CHURCHES_PK, &format!("CHURCH#{}", id)).await?;
        Ok(item.as_ref().and_then(item_to_church))
    }

    async fn put_church(&self, church: &Church) -> Result<(), ApiError> {
        self.put(church_to_item(church)).await
    }

    async fn delete_church(&self, id: &str) -> Result<(), ApiError> {
        self.delete(CHURCHES_PK, &format!("CHURCH#{}", id)).await
    }

    async fn list_field_overrides(&self) -> Result<Vec<StoredOptions>, ApiError> {
        let items = self
            .query_partition(FIELD_OPTIONS_PK, "FIELD#", None)
            .await?;
        Ok(items.iter().filter_map(item_to_field_override).collect())
    }

    async fn put_field_override(&self, stored: &StoredOptions) -> Result<(), ApiError> {
        let mut item = Item::new();
        item.insert("PK".to_string(), s(FIELD_OPTIONS_PK));
        item.insert("SK".to_string(), s(format!("FIELD#{}", stored.field)));
        item.insert("field_name".to_string(), s(stored.field.as_str()));
        item.insert("options".to_string(), list(&stored.options));
        item.insert("updated_at".to_string(), s(stored.updated_at.to_rfc3339()));
        put_opt(&mut item, "updated_by", &stored.updated_by);
        self.put(item).await
    }

    async fn delete_field_override(&self, field: FieldName) -> Result<(), ApiError> {
        // DeleteItem on a missing key succeeds, which makes reset idempotent.
        self.delete(FIELD_OPTIONS_PK, &format!("FIELD#{}", field))
            .await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ApiError> {
        let item = self.get(USERS_PK, &format!("USER#{}", user_id)).await?;
        Ok(item.as_ref().and_then(item_to_user))
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let items = self.query_partition(USERS_PK, "USER#", None).await?;
        Ok(items.iter().filter_map(item_to_user).collect())
    }

    async fn put_user(&self, user: &User) -> Result<(), ApiError> {
        let mut item = Item::new();
        item.insert("PK".to_string(), s(USERS_PK));
        item.insert("SK".to_string(), s(format!("USER#{}", user.user_id)));
        item.insert("user_id".to_string(), s(&user.user_id));
        item.insert("email".to_string(), s(&user.email));
        put_opt(&mut item, "name", &user.name);
        item.insert("role".to_string(), s(user.role.as_str()));
        item.insert("created_at".to_string(), s(user.created_at.to_rfc3339()));
        put_opt(
            &mut item,
            "last_login",
            &user.last_login.map(|t| t.to_rfc3339()),
        );
        self.put(item).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        self.delete(USERS_PK, &format!("USER#{}", user_id)).await
    }

    async fn get_invite(&self, code: &str) -> Result<Option<Invite>, ApiError> {
        let item = self.get(&format!("INVITE#{}", code), "METADATA").await?;
        Ok(item.as_ref().and_then(item_to_invite))
    }

    async fn put_invite(&self, invite: &Invite) -> Result<(), ApiError> {
        let mut item = Item::new();
        item.insert("PK".to_string(), s(format!("INVITE#{}", invite.code)));
        item.insert("SK".to_string(), s("METADATA"));
        item.insert("invite_code".to_string(), s(&invite.code));
        item.insert("email".to_string(), s(&invite.email));
        item.insert("role".to_string(), s(invite.role.as_str()));
        item.insert("status".to_string(), s(invite.status.as_str()));
        item.insert("created_by".to_string(), s(&invite.created_by));
        item.insert("created_at".to_string(), s(invite.created_at.to_rfc3339()));
        item.insert("expires_at".to_string(), s(invite.expires_at.to_rfc3339()));
        put_opt(&mut item, "used_by", &invite.used_by);
        put_opt(&mut item, "used_at", &invite.used_at.map(|t| t.to_rfc3339()));
        self.put(item).await
    }

    async fn consume_invite(
        &self,
        code: &str,
        used_by: &str,
        used_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(format!("INVITE#{}", code)))
            .key("SK", AttributeValue::S("METADATA".to_string()))
            .update_expression("SET #status = :used, used_by = :used_by, used_at = :now")
            .condition_expression("attribute_exists(PK) AND #status = :pending")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":used", s(InviteStatus::Used.as_str()))
            .expression_attribute_values(":pending", s(InviteStatus::Pending.as_str()))
            .expression_attribute_values(":used_by", s(used_by))
            .expression_attribute_values(":now", s(used_at.to_rfc3339()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Err(ApiError::InvalidInvite(
                    "Invite code has already been used".to_string(),
                ))
            }
            Err(err) => Err(store_error(err)),
        }
    }
}

// ========== ATTRIBUTE HELPERS ==========

fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

fn list(values: &[String]) -> AttributeValue {
    AttributeValue::L(values.iter().map(|v| s(v.as_str())).collect())
}

fn put_opt(item: &mut Item, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        item.insert(key.to_string(), s(value.as_str()));
    }
}

fn get_s(item: &Item, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

fn get_list(item: &Item, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_l().ok())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn get_n<T: FromStr>(item: &Item, key: &str) -> Option<T> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
}

fn get_time(item: &Item, key: &str) -> Option<DateTime<Utc>> {
    get_s(item, key)
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn get_parsed<T: FromStr>(item: &Item, key: &str) -> Option<T> {
    get_s(item, key).and_then(|v| v.parse().ok())
}

// ========== PASTOR ITEMS ==========

fn pastor_to_item(pastor: &Pastor) -> Item {
    let mut item = Item::new();
    item.insert("PK".to_string(), s(PASTORS_PK));
    item.insert("SK".to_string(), s(format!("PASTOR#{}", pastor.id)));
    item.insert("id".to_string(), s(&pastor.id));
    item.insert("first_name".to_string(), s(&pastor.first_name));
    put_opt(&mut item, "middle_name", &pastor.middle_name);
    item.insert("last_name".to_string(), s(&pastor.last_name));
    item.insert("name_key".to_string(), s(pastor.name_key()));
    put_opt(
        &mut item,
        "date_of_birth",
        &pastor.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
    );
    put_opt(&mut item, "gender", &pastor.gender);
    put_opt(&mut item, "marital_status", &pastor.marital_status);
    item.insert("clergy_type".to_string(), list(&pastor.clergy_type));
    let functions: Vec<String> = pastor
        .function
        .iter()
        .map(|f| f.as_str().to_string())
        .collect();
    item.insert("function".to_string(), list(&functions));
    put_opt(&mut item, "church_id", &pastor.church_id);
    put_opt(&mut item, "church_name", &pastor.church_name);
    put_opt(&mut item, "council", &pastor.council);
    put_opt(&mut item, "area", &pastor.area);
    put_opt(&mut item, "occupation", &pastor.occupation);
    put_opt(&mut item, "email", &pastor.email);
    put_opt(&mut item, "phone", &pastor.phone);
    put_opt(&mut item, "address", &pastor.address);
    item.insert("status".to_string(), s(pastor.status.as_str()));
    put_opt(&mut item, "profile_image", &pastor.profile_image);
    item.insert("created_at".to_string(), s(pastor.created_at.to_rfc3339()));
    put_opt(
        &mut item,
        "updated_at",
        &pastor.updated_at.map(|t| t.to_rfc3339()),
    );
    item
}

fn item_to_pastor(item: &Item) -> Option<Pastor> {
    Some(Pastor {
        id: get_s(item, "id")?,
        first_name: get_s(item, "first_name").unwrap_or_default(),
        middle_name: get_s(item, "middle_name"),
        last_name: get_s(item, "last_name").unwrap_or_default(),
        date_of_birth: get_s(item, "date_of_birth")
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        gender: get_s(item, "gender"),
        marital_status: get_s(item, "marital_status"),
        clergy_type: get_list(item, "clergy_type"),
        function: get_list(item, "function")
            .iter()
            .filter_map(|f| f.parse::<PastorFunction>().ok())
            .collect(),
        church_id: get_s(item, "church_id"),
        church_name: get_s(item, "church_name"),
        council: get_s(item, "council"),
        area: get_s(item, "area"),
        occupation: get_s(item, "occupation"),
        email: get_s(item, "email"),
        phone: get_s(item, "phone"),
        address: get_s(item, "address"),
        status: get_parsed::<Status>(item, "status").unwrap_or_default(),
        profile_image: get_s(item, "profile_image"),
        created_at: get_time(item, "created_at").unwrap_or_default(),
        updated_at: get_time(item, "updated_at"),
    })
}

// ========== CHURCH ITEMS ==========

fn church_to_item(church: &Church) -> Item {
    let mut item = Item::new();
    item.insert("PK".to_string(), s(CHURCHES_PK));
    item.insert("SK".to_string(), s(format!("CHURCH#{}", church.id)));
    item.insert("id".to_string(), s(&church.id));
    item.insert("name".to_string(), s(&church.name));
    put_opt(&mut item, "location", &church.location);
    put_opt(&mut item, "head_pastor", &church.head_pastor);
    put_opt(&mut item, "head_pastor_id", &church.head_pastor_id);
    if let Some(count) = church.member_count {
        item.insert("member_count".to_string(), AttributeValue::N(count.to_string()));
    }
    if let Some(income) = church.income {
        item.insert("income".to_string(), AttributeValue::N(income.to_string()));
    }
    item.insert("images".to_string(), list(&church.images));
    item.insert("status".to_string(), s(church.status.as_str()));
    item.insert("created_at".to_string(), s(church.created_at.to_rfc3339()));
    put_opt(
        &mut item,
        "updated_at",
        &church.updated_at.map(|t| t.to_rfc3339()),
    );
    item
}

fn item_to_church(item: &Item) -> Option<Church> {
    Some(Church {
        id: get_s(item, "id")?,
        name: get_s(item, "name").unwrap_or_default(),
        location: get_s(item, "location"),
        head_pastor: get_s(item, "head_pastor"),
        head_pastor_id: get_s(item, "head_pastor_id"),
        member_count: get_n(item, "member_count"),
        income: get_n(item, "income"),
        images: get_list(item, "images"),
        status: get_parsed::<Status>(item, "status").unwrap_or_default(),
        created_at: get_time(item, "created_at").unwrap_or_default(),
        updated_at: get_time(item, "updated_at"),
    })
}

// ========== OTHER ITEMS ==========

fn item_to_field_override(item: &Item) -> Option<StoredOptions> {
    Some(StoredOptions {
        field: get_parsed::<FieldName>(item, "field_name")?,
        options: get_list(item, "options"),
        updated_at: get_time(item, "updated_at").unwrap_or_default(),
        updated_by: get_s(item, "updated_by"),
    })
}

fn item_to_user(item: &Item) -> Option<User> {
    Some(User {
        user_id: get_s(item, "user_id")?,
        email: get_s(item, "email").unwrap_or_default(),
        name: get_s(item, "name"),
        role: get_parsed::<Role>(item, "role").unwrap_or_default(),
        created_at: get_time(item, "created_at").unwrap_or_default(),
        last_login: get_time(item, "last_login"),
    })
}

fn item_to_invite(item: &Item) -> Option<Invite> {
    let status = match get_s(item, "status")?.as_str() {
        "pending" => InviteStatus::Pending,
        _ => InviteStatus::Used,
    };
    Some(Invite {
        code: get_s(item, "invite_code")?,
        email: get_s(item, "email").unwrap_or_default(),
        role: get_parsed::<Role>(item, "role").unwrap_or_default(),
        status,
        created_by: get_s(item, "created_by").unwrap_or_default(),
        created_at: get_time(item, "created_at").unwrap_or_default(),
        expires_at: get_time(item, "expires_at")?,
        used_by: get_s(item, "used_by"),
        used_at: get_time(item, "used_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pastor() -> Pastor {
        Pastor {
            id: "p-1".to_string(),
            first_name: "John".to_string(),
            middle_name: None,
            last_name: "Doe".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1961, 4, 12),
            gender: Some("Male".to_string()),
            marital_status: None,
            clergy_type: vec!["Bishop".to_string(), "Pastor".to_string()],
            function: vec![PastorFunction::Overseer],
            church_id: Some("c-9".to_string()),
            church_name: None,
            council: Some("Council 2".to_string()),
            area: None,
            occupation: None,
            email: None,
            phone: Some("+1 555 0100".to_string()),
            address: None,
            status: Status::Inactive,
            profile_image: None,
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            updated_at: None,
        }
    }

    #[test]
    fn test_pastor_item_layout() {
        let item = pastor_to_item(&sample_pastor());
        assert_eq!(get_s(&item, "PK").unwrap(), "DIRECTORY#PASTORS");
        assert_eq!(get_s(&item, "SK").unwrap(), "PASTOR#p-1");
        assert_eq!(get_s(&item, "name_key").unwrap(), "john|doe");
        assert_eq!(get_s(&item, "date_of_birth").unwrap(), "1961-04-12");
        assert!(!item.contains_key("middle_name"));
    }

    #[test]
    fn test_pastor_item_restores_record() {
        let pastor = sample_pastor();
        let restored = item_to_pastor(&pastor_to_item(&pastor)).unwrap();
        assert_eq!(restored, pastor);
    }

    #[test]
    fn test_church_numbers_are_stored_as_n() {
        let church = Church {
            id: "c-1".to_string(),
            name: "Grace Chapel".to_string(),
            location: None,
            head_pastor: None,
            head_pastor_id: None,
            member_count: Some(250),
            income: Some(1200.5),
            images: vec![],
            status: Status::Active,
            created_at: Utc::now(),
            updated_at: None,
        };
        let item = church_to_item(&church);
        assert_eq!(item.get("member_count").unwrap().as_n().unwrap(), "250");
        let restored = item_to_church(&item).unwrap();
        assert_eq!(restored.income, Some(1200.5));
        assert_eq!(restored.member_count, Some(250));
    }

    #[test]
    fn test_item_without_id_is_skipped() {
        let mut item = Item::new();
        item.insert("PK".to_string(), s(PASTORS_PK));
        assert!(item_to_pastor(&item).is_none());
    }
}
