// ABOUTME: Integration tests for the SQLite store
// ABOUTME: Tenant and user scoping, partial updates, semantic ranking, and usage aggregation

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use blueprint_server::{
    database::{
        ConversationPatch, CreateConversation, CreateDiagram, CreateDocument, CreateProject,
        DocumentPatch, DocumentSelection, ProjectPatch, TokenUsageRecord,
    },
    llm::EmbeddingApi,
    models::{ResourceGroupType, TenantId},
};
use common::{create_test_database, KeywordEmbeddings};
use serde_json::json;
use uuid::Uuid;

fn project(kind: ResourceGroupType, name: &str) -> CreateProject {
    CreateProject {
        kind,
        name: name.to_owned(),
        description: None,
        cloud_provider: Some("azure".to_owned()),
        region: None,
        metadata: Some(json!({"owner": "platform"})),
    }
}

async fn embed(text: &str) -> Vec<f32> {
    KeywordEmbeddings.create_embedding(text).await.unwrap()
}

#[tokio::test]
async fn test_conversations_are_scoped_to_tenant_and_user() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let owner = Uuid::new_v4();

    let created = database
        .create_conversation(
            tenant_id,
            owner,
            &CreateConversation {
                title: Some("Network review".to_owned()),
                temperature: Some(0.3),
                ..CreateConversation::default()
            },
        )
        .await
        .unwrap();
    let id = Uuid::parse_str(&created.id).unwrap();

    assert!(database
        .get_conversation(id, tenant_id, owner)
        .await
        .unwrap()
        .is_some());
    assert!(database
        .get_conversation(id, tenant_id, Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
    assert!(database
        .get_conversation(id, TenantId::new(), owner)
        .await
        .unwrap()
        .is_none());
    assert!(database
        .list_conversations(TenantId::new(), owner, 50, 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_default_title_and_pagination() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let user_id = Uuid::new_v4();

    for _ in 0..3 {
        database
            .create_conversation(tenant_id, user_id, &CreateConversation::default())
            .await
            .unwrap();
    }

    let page = database
        .list_conversations(tenant_id, user_id, 2, 0)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.iter().all(|c| c.title == "New conversation"));

    let rest = database
        .list_conversations(tenant_id, user_id, 2, 2)
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
}

#[tokio::test]
async fn test_conversation_patch_touches_only_supplied_fields() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let user_id = Uuid::new_v4();
    let created = database
        .create_conversation(
            tenant_id,
            user_id,
            &CreateConversation {
                temperature: Some(0.3),
                system_prompt: Some("Be terse.".to_owned()),
                ..CreateConversation::default()
            },
        )
        .await
        .unwrap();
    let id = Uuid::parse_str(&created.id).unwrap();

    let updated = database
        .update_conversation(
            id,
            tenant_id,
            user_id,
            &ConversationPatch {
                title: Some("Renamed".to_owned()),
                ..ConversationPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let stored = database
        .get_conversation(id, tenant_id, user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.temperature, Some(0.3));
    assert_eq!(stored.system_prompt.as_deref(), Some("Be terse."));

    assert!(!database
        .update_conversation(
            id,
            TenantId::new(),
            user_id,
            &ConversationPatch {
                title: Some("Hijacked".to_owned()),
                ..ConversationPatch::default()
            },
        )
        .await
        .unwrap());

    assert!(database.delete_conversation(id, tenant_id, user_id).await.unwrap());
    assert!(!database.delete_conversation(id, tenant_id, user_id).await.unwrap());
}

#[tokio::test]
async fn test_prompt_round_trip_defaults_to_no_selections() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let user_id = Uuid::new_v4();
    let conversation_id = Uuid::new_v4();

    let bare = database
        .insert_prompt(conversation_id, tenant_id, user_id, "What changed?", None)
        .await
        .unwrap();
    let stored = database.get_prompt(&bare.id, tenant_id).await.unwrap().unwrap();
    assert_eq!(stored, bare);
    assert!(stored.document_selections.is_empty());

    let selections = [DocumentSelection {
        document_id: "doc-1".to_owned(),
        title: None,
        text: "Peering is one-way.".to_owned(),
    }];
    let attached = database
        .insert_prompt(conversation_id, tenant_id, user_id, "Explain", Some(&selections))
        .await
        .unwrap();
    let stored = database.get_prompt(&attached.id, tenant_id).await.unwrap().unwrap();
    assert_eq!(stored.document_selections, selections);

    assert!(database
        .get_prompt(&attached.id, TenantId::new())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_project_patch_and_kind_filter() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();

    let created = database
        .create_project(tenant_id, &project(ResourceGroupType::Project, "Landing zone"))
        .await
        .unwrap();
    database
        .create_project(tenant_id, &project(ResourceGroupType::Template, "Hub template"))
        .await
        .unwrap();
    let id = Uuid::parse_str(&created.id).unwrap();

    assert!(database
        .update_project(
            id,
            tenant_id,
            &ProjectPatch {
                region: Some("northeurope".to_owned()),
                ..ProjectPatch::default()
            },
        )
        .await
        .unwrap());

    let stored = database.get_project(id, tenant_id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Landing zone");
    assert_eq!(stored.region.as_deref(), Some("northeurope"));
    assert_eq!(stored.metadata["owner"], "platform");

    let templates = database
        .list_projects(tenant_id, Some(ResourceGroupType::Template))
        .await
        .unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name, "Hub template");

    assert!(database.get_project(id, TenantId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_community_templates_are_readable_by_every_tenant() {
    let database = create_test_database().await.unwrap();
    let author = TenantId::new();
    let reader = TenantId::new();

    let template = database
        .create_project(author, &project(ResourceGroupType::CommunityTemplate, "Shared hub"))
        .await
        .unwrap();
    let template_id = Uuid::parse_str(&template.id).unwrap();

    let request = CreateDocument {
        resource_group_type: ResourceGroupType::CommunityTemplate,
        resource_group_id: template_id,
        title: "Shared network".to_owned(),
        content: "network baseline".to_owned(),
    };
    database
        .create_document(author, &request, Some(embed(&request.embedding_text()).await.as_slice()))
        .await
        .unwrap();

    assert!(database.get_project(template_id, reader).await.unwrap().is_some());
    let hits = database
        .search_documents(
            reader,
            ResourceGroupType::CommunityTemplate,
            template_id,
            &embed("network").await,
            5,
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.title, "Shared network");
}

#[tokio::test]
async fn test_document_search_ranks_within_group() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let group = Uuid::new_v4();
    let other_group = Uuid::new_v4();

    for (group_id, title, content) in [
        (group, "Identity", "identity and access with managed identity"),
        (group, "Network", "network segmentation and network security groups"),
        (other_group, "Other network", "network network network"),
    ] {
        let request = CreateDocument {
            resource_group_type: ResourceGroupType::Project,
            resource_group_id: group_id,
            title: title.to_owned(),
            content: content.to_owned(),
        };
        let embedding = embed(&request.embedding_text()).await;
        database
            .create_document(tenant_id, &request, Some(embedding.as_slice()))
            .await
            .unwrap();
    }
    // Documents without an embedding are never ranked
    database
        .create_document(
            tenant_id,
            &CreateDocument {
                resource_group_type: ResourceGroupType::Project,
                resource_group_id: group,
                title: "Draft".to_owned(),
                content: "network".to_owned(),
            },
            None,
        )
        .await
        .unwrap();

    let hits = database
        .search_documents(
            tenant_id,
            ResourceGroupType::Project,
            group,
            &embed("network layout").await,
            10,
        )
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.title, "Network");
    assert!(hits[0].score > hits[1].score);

    let limited = database
        .search_documents(tenant_id, ResourceGroupType::Project, group, &embed("network").await, 1)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_document_patch_keeps_untouched_fields() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let request = CreateDocument {
        resource_group_type: ResourceGroupType::Project,
        resource_group_id: Uuid::new_v4(),
        title: "Runbook".to_owned(),
        content: "Rotate storage keys".to_owned(),
    };
    let created = database
        .create_document(tenant_id, &request, Some(embed(&request.embedding_text()).await.as_slice()))
        .await
        .unwrap();
    assert!(created.has_embedding);
    let id = Uuid::parse_str(&created.id).unwrap();

    assert!(database
        .update_document(
            id,
            tenant_id,
            &DocumentPatch {
                title: Some("Storage runbook".to_owned()),
                ..DocumentPatch::default()
            },
            None,
        )
        .await
        .unwrap());

    let stored = database.get_document(id, tenant_id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Storage runbook");
    assert_eq!(stored.content, "Rotate storage keys");
    assert!(stored.has_embedding);
}

#[tokio::test]
async fn test_diagram_search_uses_description_and_definition() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let group = Uuid::new_v4();

    for (name, description) in [
        ("Data tier", "database replicas"),
        ("Observability", "monitoring and alerting"),
    ] {
        let request = CreateDiagram {
            resource_group_type: ResourceGroupType::Project,
            resource_group_id: group,
            name: name.to_owned(),
            description: Some(description.to_owned()),
            definition: Some(json!({"nodes": []})),
        };
        let embedding = embed(&request.embedding_text()).await;
        database
            .create_diagram(tenant_id, &request, Some(embedding.as_slice()))
            .await
            .unwrap();
    }

    let hits = database
        .search_diagrams(
            tenant_id,
            ResourceGroupType::Project,
            group,
            &embed("monitoring").await,
            5,
        )
        .await
        .unwrap();
    assert_eq!(hits[0].diagram.name, "Observability");
}

#[tokio::test]
async fn test_usage_summary_aggregates_calls() {
    let database = create_test_database().await.unwrap();
    let tenant_id = TenantId::new();
    let user_id = Uuid::new_v4();
    let conversation_id = Uuid::new_v4();

    for completion_tokens in [10, 15] {
        database
            .insert_token_usage(&TokenUsageRecord {
                tenant_id,
                user_id,
                conversation_id: Some(conversation_id),
                vendor: "openai".to_owned(),
                model: "gpt-4.1".to_owned(),
                prompt_tokens: 100,
                completion_tokens,
            })
            .await
            .unwrap();
    }

    let summary = database
        .get_conversation_usage(conversation_id, tenant_id)
        .await
        .unwrap();
    assert_eq!(summary.calls, 2);
    assert_eq!(summary.prompt_tokens, 200);
    assert_eq!(summary.completion_tokens, 25);
    assert_eq!(summary.total_tokens, 225);

    let foreign = database
        .get_conversation_usage(conversation_id, TenantId::new())
        .await
        .unwrap();
    assert_eq!(foreign.calls, 0);
}
