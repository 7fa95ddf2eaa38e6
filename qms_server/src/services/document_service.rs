//! Controlled documents.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::document::{Document, DocumentView, NewDocument};
use crate::schema::qms_documents;

/// Active and archived documents, most recently updated first.
pub async fn list_all(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<Document>> {
    let documents = qms_documents::table
        .order((qms_documents::write_date.desc(), qms_documents::id.desc()))
        .select(Document::as_select())
        .load(conn)
        .await?;
    Ok(documents)
}

pub async fn list(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<DocumentView>> {
    let now = Utc::now();
    Ok(list_all(conn)
        .await?
        .into_iter()
        .map(|d| DocumentView::new(d, now))
        .collect())
}

pub async fn create(
    conn: &mut AsyncPgConnection,
    new_document: NewDocument,
) -> anyhow::Result<DocumentView> {
    let document: Document = diesel::insert_into(qms_documents::table)
        .values(&new_document)
        .returning(Document::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("document");
    tracing::info!(document_id = document.id, title = %document.title, "Document created");
    Ok(DocumentView::new(document, Utc::now()))
}
