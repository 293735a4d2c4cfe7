use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};
use pinmap_shared::keys;
use pinmap_shared::models::{DocumentFields, NO_IMAGE};

use crate::storage::{Storage, StoredDocument};

// GraphQL output types

#[derive(SimpleObject)]
pub struct GqlDocument {
    pub id: ID,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_key: String,
    pub created_at: String,
}

impl From<StoredDocument> for GqlDocument {
    fn from(d: StoredDocument) -> Self {
        GqlDocument {
            id: ID(d.id),
            title: d.fields.title,
            latitude: d.fields.latitude,
            longitude: d.fields.longitude,
            image_key: d.fields.image_key,
            created_at: d.created_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlBlob {
    pub key: String,
    pub size: u64,
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub total_documents: u64,
    pub total_blobs: u64,
    pub db_size_bytes: u64,
}

// Input types

#[derive(InputObject)]
pub struct DocumentFieldsInput {
    pub title: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub image_key: Option<String>,
}

fn check_namespace(namespace: &str) -> async_graphql::Result<()> {
    if keys::is_valid_segment(namespace) {
        Ok(())
    } else {
        Err(async_graphql::Error::new(format!(
            "Invalid namespace: {:?}",
            namespace
        )))
    }
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn documents(
        &self,
        ctx: &Context<'_>,
        namespace: String,
    ) -> async_graphql::Result<Vec<GqlDocument>> {
        check_namespace(&namespace)?;
        let storage = ctx.data::<Arc<Storage>>()?;
        let docs = storage
            .list_documents(&namespace)
            .map_err(async_graphql::Error::new)?;
        Ok(docs.into_iter().map(GqlDocument::from).collect())
    }

    async fn blob(&self, ctx: &Context<'_>, key: String) -> async_graphql::Result<Option<GqlBlob>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let size = storage.blob_size(&key).map_err(async_graphql::Error::new)?;
        Ok(size.map(|size| GqlBlob { key, size }))
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let storage = ctx.data::<Arc<Storage>>()?;
        Ok(GqlStats {
            total_documents: storage
                .count_documents()
                .map_err(async_graphql::Error::new)?,
            total_blobs: storage.count_blobs().map_err(async_graphql::Error::new)?,
            db_size_bytes: storage.db_size_bytes().map_err(async_graphql::Error::new)?,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_document(
        &self,
        ctx: &Context<'_>,
        namespace: String,
        input: DocumentFieldsInput,
    ) -> async_graphql::Result<GqlDocument> {
        check_namespace(&namespace)?;
        if !input.latitude.is_finite() || !input.longitude.is_finite() {
            return Err(async_graphql::Error::new("Coordinates must be finite"));
        }
        let storage = ctx.data::<Arc<Storage>>()?;

        let fields = DocumentFields {
            title: input.title.unwrap_or_default(),
            latitude: input.latitude,
            longitude: input.longitude,
            image_key: input.image_key.unwrap_or_else(|| NO_IMAGE.to_string()),
        };
        let doc = storage
            .create_document(&namespace, fields)
            .map_err(async_graphql::Error::new)?;

        tracing::info!(namespace = %namespace, id = %doc.id, "Document created");
        Ok(GqlDocument::from(doc))
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(storage: Arc<Storage>) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(storage)
        .finish()
}
