use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Select, Set, Statement, sea_query::Expr,
};
use serde_json::Value;

use crate::{
    entities::film,
    models::{Document, ID_FIELD},
    object_id::ObjectId,
    store::{DeleteResult, DocumentStore, Filter, StoreError, StoreResult},
};

// Rowids only ever grow past the live maximum, so they give insertion order.
const FIRST_FILM: &str = "id = (SELECT id FROM films ORDER BY rowid LIMIT 1)";

/// The `films` collection, one JSON document per row.
#[derive(Clone)]
pub struct FilmCollection {
    db: DatabaseConnection,
}

impl FilmCollection {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn select(filter: Filter) -> Select<film::Entity> {
        let query = film::Entity::find().order_by_asc(Expr::cust("rowid"));
        match filter {
            Filter::All => query,
            Filter::Id(id) => query.filter(film::Column::Id.eq(id.to_hex())),
        }
    }

    fn statement(&self, sql: String, values: Vec<sea_orm::Value>) -> Statement {
        Statement::from_sql_and_values(self.db.get_database_backend(), sql, values)
    }
}

#[async_trait]
impl DocumentStore for FilmCollection {
    async fn find_many(&self, filter: Filter) -> StoreResult<Vec<Document>> {
        let rows = Self::select(filter).all(&self.db).await?;
        rows.into_iter().map(into_document).collect()
    }

    async fn find_one(&self, filter: Filter) -> StoreResult<Option<Document>> {
        let row = Self::select(filter).one(&self.db).await?;
        row.map(into_document).transpose()
    }

    async fn insert_one(&self, document: Document) -> StoreResult<Document> {
        let id = ObjectId::new();
        let model = film::ActiveModel {
            id: Set(id.to_hex()),
            document: Set(Value::Object(document.clone())),
            created_at: Set(id.timestamp()),
        };

        film::Entity::insert(model).exec_without_returning(&self.db).await?;

        Ok(with_id(&id.to_hex(), document))
    }

    async fn find_one_and_update(
        &self,
        filter: Filter,
        patch: Document,
    ) -> StoreResult<Option<Document>> {
        if patch.is_empty() {
            return self.find_one(filter).await;
        }

        // One statement so the merge cannot interleave with another writer.
        let mut sql = String::from("UPDATE films SET document = json_set(document");
        let mut values: Vec<sea_orm::Value> = Vec::with_capacity(patch.len() * 2 + 1);
        for (field, value) in &patch {
            sql.push_str(", ?, json(?)");
            values.push(format!("$.\"{field}\"").into());
            values.push(value.to_string().into());
        }
        sql.push_str(") WHERE ");
        match filter {
            Filter::All => sql.push_str(FIRST_FILM),
            Filter::Id(id) => {
                sql.push_str("id = ?");
                values.push(id.to_hex().into());
            },
        }
        sql.push_str(" RETURNING id, document");

        let Some(row) = self.db.query_one(self.statement(sql, values)).await? else {
            return Ok(None);
        };

        let id: String = row.try_get("", "id")?;
        let raw: String = row.try_get("", "document")?;
        let document = serde_json::from_str(&raw)
            .map_err(|source| StoreError::Corrupt { id: id.clone(), source })?;

        into_document(film::Model { id, document, created_at: 0 }).map(Some)
    }

    async fn delete_one(&self, filter: Filter) -> StoreResult<DeleteResult> {
        let deleted_count = match filter {
            Filter::Id(id) => {
                film::Entity::delete_by_id(id.to_hex()).exec(&self.db).await?.rows_affected
            },
            Filter::All => {
                let sql = format!("DELETE FROM films WHERE {FIRST_FILM}");
                self.db.execute(self.statement(sql, Vec::new())).await?.rows_affected()
            },
        };

        Ok(DeleteResult { deleted_count })
    }
}

fn into_document(model: film::Model) -> StoreResult<Document> {
    match model.document {
        Value::Object(fields) => Ok(with_id(&model.id, fields)),
        _ => Err(StoreError::NotAnObject(model.id)),
    }
}

fn with_id(id: &str, fields: Document) -> Document {
    let mut doc = Document::with_capacity(fields.len() + 1);
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc.extend(fields.into_iter().filter(|(k, _)| k != ID_FIELD));
    doc
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn collection() -> FilmCollection {
        let db = crate::db::connect_and_migrate("sqlite::memory:", 1).await.unwrap();
        FilmCollection::new(db)
    }

    fn film(title: &str) -> Document {
        match json!({
            "title": title,
            "year": 1927,
            "cast": ["Alfred Abel"],
            "imdb": { "rating": 8.3, "votes": 99845 },
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn id_of(doc: &Document) -> ObjectId {
        doc[ID_FIELD].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn inserted_document_is_found_unchanged() {
        let films = collection().await;
        let created = films.insert_one(film("TEST Metropolis")).await.unwrap();

        assert_eq!(created.keys().next().map(String::as_str), Some(ID_FIELD));
        let found = films.find_one(Filter::Id(id_of(&created))).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn find_many_returns_every_document_in_creation_order() {
        let films = collection().await;
        let first = films.insert_one(film("TEST One")).await.unwrap();
        let second = films.insert_one(film("TEST Two")).await.unwrap();

        let all = films.find_many(Filter::All).await.unwrap();
        assert_eq!(all, vec![first.clone(), second]);

        let only = films.find_many(Filter::Id(id_of(&first))).await.unwrap();
        assert_eq!(only, vec![first]);
    }

    async fn insert_raw(films: &FilmCollection, id: &str, document: Value) {
        let model = film::ActiveModel {
            id: Set(id.to_string()),
            document: Set(document),
            created_at: Set(0),
        };
        film::Entity::insert(model).exec_without_returning(&films.db).await.unwrap();
    }

    #[tokio::test]
    async fn listing_follows_insertion_not_id_order() {
        let films = collection().await;
        insert_raw(&films, "ffffffffffffffffffffffff", json!({ "title": "TEST late id" })).await;
        insert_raw(&films, "000000000000000000000000", json!({ "title": "TEST early id" })).await;

        let titles: Vec<_> = films
            .find_many(Filter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc["title"].clone())
            .collect();
        assert_eq!(titles, [json!("TEST late id"), json!("TEST early id")]);

        assert_eq!(films.delete_one(Filter::All).await.unwrap().deleted_count, 1);
        let left = films.find_many(Filter::All).await.unwrap();
        assert_eq!(left[0][ID_FIELD], "000000000000000000000000");
    }

    #[tokio::test]
    async fn non_object_rows_surface_as_store_errors() {
        let films = collection().await;
        let id = "5f2b605f821f89025ab21f0a";
        insert_raw(&films, id, json!(["not", "a", "film"])).await;

        let err = films.find_one(Filter::Id(id.parse().unwrap())).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject(ref bad) if bad == id));
        assert!(films.find_many(Filter::All).await.is_err());
    }

    #[tokio::test]
    async fn update_sets_only_patched_fields() {
        let films = collection().await;
        let created = films.insert_one(film("TEST Metropolis")).await.unwrap();
        let id = id_of(&created);

        let patch = match json!({ "title": "TEST after update", "awards": { "wins": 3 } }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let updated = films.find_one_and_update(Filter::Id(id), patch).await.unwrap().unwrap();

        assert_eq!(updated["title"], "TEST after update");
        assert_eq!(updated["year"], 1927);
        assert_eq!(updated["cast"], json!(["Alfred Abel"]));
        assert_eq!(updated["imdb"], json!({ "rating": 8.3, "votes": 99845 }));
        assert_eq!(updated["awards"], json!({ "wins": 3 }));
        assert_eq!(films.find_one(Filter::Id(id)).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn update_replaces_nested_objects_whole() {
        let films = collection().await;
        let id = id_of(&films.insert_one(film("TEST Metropolis")).await.unwrap());

        let patch = match json!({ "imdb": { "rating": 9.0 } }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let updated = films.find_one_and_update(Filter::Id(id), patch).await.unwrap().unwrap();
        assert_eq!(updated["imdb"], json!({ "rating": 9.0 }));
    }

    #[tokio::test]
    async fn empty_patch_leaves_document_untouched() {
        let films = collection().await;
        let created = films.insert_one(film("TEST Metropolis")).await.unwrap();

        let updated = films.find_one_and_update(Filter::Id(id_of(&created)), Document::new()).await;
        assert_eq!(updated.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_absent() {
        let films = collection().await;
        let updated = films.find_one_and_update(Filter::Id(ObjectId::new()), film("TEST")).await;
        assert!(updated.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_at_most_one_document() {
        let films = collection().await;
        let id = id_of(&films.insert_one(film("TEST One")).await.unwrap());
        films.insert_one(film("TEST Two")).await.unwrap();

        assert_eq!(films.delete_one(Filter::Id(id)).await.unwrap().deleted_count, 1);
        assert_eq!(films.delete_one(Filter::Id(id)).await.unwrap().deleted_count, 0);
        assert!(films.find_one(Filter::Id(id)).await.unwrap().is_none());

        assert_eq!(films.delete_one(Filter::All).await.unwrap().deleted_count, 1);
        assert!(films.find_many(Filter::All).await.unwrap().is_empty());
    }
}
