mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::TestApp;
use factory_infohub::{
    entities::content::faq_question::FaqStatus,
    entities::user::UserRole,
    entities::worker::{Availability, Gender},
    errors::ServiceError,
    services::{
        admin::TrashKind,
        blog::{BlogFilter, BlogPostRequest, BlogStatistics},
        faq::{FaqRequest, FaqSearchQuery, FeedbackRequest, Visitor},
        locations::{
            CreateDistrictRequest, CreateRegionRequest, UpdateCountryRequest, UpdatePlaceRequest,
            UpdateRegionRequest,
        },
        workers::{ExperienceRequest, WorkerRequest},
        Actor,
    },
};
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn faq(category_id: uuid::Uuid, title: &str, publish: bool) -> FaqRequest {
    FaqRequest {
        title: title.to_string(),
        category_id,
        question_text: format!("{title}?"),
        answer_text: "Contact details are emailed right after payment.".to_string(),
        is_featured: false,
        tags: "payments, email".to_string(),
        sort_order: 0,
        publish,
    }
}

#[tokio::test]
async fn duplicate_names_get_numbered_slugs() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    assert_eq!(dir.category.slug, "textiles");
    assert_eq!(dir.subcategory.slug, "textiles-cotton");

    let first = app.create_factory(&dir, "Alpha Looms", dec!(100)).await;
    let second = app.create_factory(&dir, "Alpha Looms", dec!(100)).await;
    let third = app.create_factory(&dir, "Alpha  Looms!", dec!(100)).await;
    assert_eq!(first.slug, "alpha-looms");
    assert_eq!(second.slug, "alpha-looms-1");
    assert_eq!(third.slug, "alpha-looms-2");

    // Deleted rows keep their slug reserved
    app.services()
        .factories
        .delete_factory(&first.slug)
        .await
        .unwrap();
    let fourth = app.create_factory(&dir, "Alpha Looms", dec!(100)).await;
    assert_eq!(fourth.slug, "alpha-looms-3");
}

#[tokio::test]
async fn soft_deleted_factories_leave_listings_until_restored() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let factory = app.create_factory(&dir, "Omega Mills", dec!(100)).await;
    let services = app.services();

    services
        .factories
        .delete_factory(&factory.slug)
        .await
        .unwrap();
    assert_matches!(
        services.factories.get_by_slug(&factory.slug).await,
        Err(ServiceError::NotFound(_))
    );
    let trash = services
        .admin
        .list_deleted(TrashKind::Factory)
        .await
        .unwrap();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].id, factory.id);

    services
        .admin
        .restore(TrashKind::Factory, factory.id)
        .await
        .unwrap();
    assert!(services.factories.get_by_slug(&factory.slug).await.is_ok());
    assert!(services
        .admin
        .list_deleted(TrashKind::Factory)
        .await
        .unwrap()
        .is_empty());

    let missing = services
        .admin
        .restore(TrashKind::Factory, uuid::Uuid::new_v4())
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn region_hierarchy_names_every_level() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let locations = &app.services().locations;

    let district = locations
        .create_district(CreateDistrictRequest {
            city_id: dir.city.id,
            name: "Athwa".to_string(),
            code: String::new(),
        })
        .await
        .unwrap();
    let region = locations
        .create_region(CreateRegionRequest {
            district_id: district.id,
            name: "Ghod Dod Road".to_string(),
            code: String::new(),
            description: String::new(),
        })
        .await
        .unwrap();

    let hierarchy = locations.location_hierarchy(region.id).await.unwrap();
    assert_eq!(hierarchy.city, "Surat");
    assert_eq!(hierarchy.country, "India");
    assert_eq!(
        hierarchy.display(),
        "Ghod Dod Road, Athwa, Surat, Gujarat, India"
    );

    let cities = locations.cities_of(dir.state.id).await.unwrap();
    assert_eq!(cities.len(), 1);
    let regions = locations.regions_of(district.id).await.unwrap();
    assert_eq!(regions[0].id, region.id);
}

#[tokio::test]
async fn locations_can_be_edited_and_trashed_leaf_first() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let services = app.services();
    let locations = &services.locations;

    let district = locations
        .create_district(CreateDistrictRequest {
            city_id: dir.city.id,
            name: "Adajan".to_string(),
            code: String::new(),
        })
        .await
        .unwrap();
    let region = locations
        .create_region(CreateRegionRequest {
            district_id: district.id,
            name: "Pal".to_string(),
            code: String::new(),
            description: String::new(),
        })
        .await
        .unwrap();
    let sibling = locations
        .create_region(CreateRegionRequest {
            district_id: district.id,
            name: "Rander".to_string(),
            code: String::new(),
            description: String::new(),
        })
        .await
        .unwrap();

    let renamed = locations
        .update_region(
            region.id,
            UpdateRegionRequest {
                name: Some("Pal Gam".to_string()),
                description: Some("Riverside".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Pal Gam");
    assert_eq!(renamed.description, "Riverside");
    assert_eq!(renamed.slug, region.slug);

    let clash = locations
        .update_region(
            sibling.id,
            UpdateRegionRequest {
                name: Some("Pal Gam".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(clash, Err(ServiceError::Conflict(_)));

    let country = locations
        .update_country(
            dir.country.id,
            UpdateCountryRequest {
                name: Some("Bharat".to_string()),
                code: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(country.name, "Bharat");
    assert_eq!(country.code, "IND");
    let state = locations
        .update_state(
            dir.state.id,
            UpdatePlaceRequest {
                code: Some("GUJ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(state.code, "GUJ");

    // Parents with live children stay put
    assert_matches!(
        locations.delete_district(district.id).await,
        Err(ServiceError::InvalidOperation(_))
    );
    assert_matches!(
        locations.delete_country(dir.country.id).await,
        Err(ServiceError::InvalidOperation(_))
    );

    locations.delete_region(region.id).await.unwrap();
    locations.delete_region(sibling.id).await.unwrap();
    assert_matches!(
        locations.get_region(region.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(locations.regions_of(district.id).await.unwrap().is_empty());
    locations.delete_district(district.id).await.unwrap();

    let trash = services.admin.list_deleted(TrashKind::Region).await.unwrap();
    assert_eq!(trash.len(), 2);
    services
        .admin
        .restore(TrashKind::District, district.id)
        .await
        .unwrap();
    assert_eq!(
        locations.get_district(district.id).await.unwrap().name,
        "Adajan"
    );

    assert_matches!(
        locations.delete_city(uuid::Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn worker_experiences_cannot_overlap() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let owner = app.register_user("owner", UserRole::User).await;
    let other = app.register_user("other", UserRole::User).await;
    let workers = &app.services().workers;

    let worker = workers
        .register_worker(
            Some(owner.id),
            WorkerRequest {
                full_name: "Meena Shah".to_string(),
                date_of_birth: Some(date(1990, 4, 2)),
                gender: Gender::Female,
                phone_number: "9876500000".to_string(),
                email: None,
                category_id: dir.category.id,
                subcategory_id: Some(dir.subcategory.id),
                years_of_experience: 8,
                skills: "weaving, dyeing, quality control".to_string(),
                availability: Availability::FullTime,
                expected_daily_wage: dec!(900),
                country_id: Some(dir.country.id),
                state_id: Some(dir.state.id),
                city_id: Some(dir.city.id),
                district_id: None,
                region_id: None,
                address: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(worker.slug, "meena-shah");

    let owner_actor = Actor {
        user_id: owner.id,
        is_staff: false,
    };
    workers
        .add_experience(
            owner_actor,
            &worker.slug,
            ExperienceRequest {
                company_name: "Alpha Looms".to_string(),
                job_title: "Weaver".to_string(),
                start_date: date(2015, 1, 1),
                end_date: Some(date(2019, 12, 31)),
                description: String::new(),
                is_current: false,
            },
        )
        .await
        .unwrap();

    let overlapping = workers
        .add_experience(
            owner_actor,
            &worker.slug,
            ExperienceRequest {
                company_name: "Beta Dyes".to_string(),
                job_title: "Dyer".to_string(),
                start_date: date(2019, 6, 1),
                end_date: None,
                description: String::new(),
                is_current: true,
            },
        )
        .await;
    assert_matches!(overlapping, Err(ServiceError::ValidationError(_)));

    let stranger = workers
        .add_experience(
            Actor {
                user_id: other.id,
                is_staff: false,
            },
            &worker.slug,
            ExperienceRequest {
                company_name: "Gamma Knits".to_string(),
                job_title: "Supervisor".to_string(),
                start_date: date(2020, 1, 1),
                end_date: None,
                description: String::new(),
                is_current: true,
            },
        )
        .await;
    assert_matches!(stranger, Err(ServiceError::Forbidden(_)));

    let profile = workers.profile(&worker.slug).await.unwrap();
    assert_eq!(profile.experiences.len(), 1);
    assert_eq!(profile.skill_list.len(), 3);
}

#[tokio::test]
async fn faq_views_searches_and_feedback() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let reader = app.register_user("reader", UserRole::User).await;
    let faq_service = &app.services().faq;

    let question = faq_service
        .create_question(None, faq(dir.category.id, "How do payments work", true))
        .await
        .unwrap();
    let draft = faq_service
        .create_question(None, faq(dir.category.id, "Draft payments note", false))
        .await
        .unwrap();
    assert_eq!(question.status, FaqStatus::Published);
    assert_eq!(draft.status, FaqStatus::Draft);

    let view = faq_service.view_question(&question.slug).await.unwrap();
    assert_eq!(view.question.view_count, 1);
    assert_eq!(view.tags, vec!["payments", "email"]);
    assert_matches!(
        faq_service.view_question(&draft.slug).await,
        Err(ServiceError::NotFound(_))
    );

    let visitor = Visitor {
        user_id: Some(reader.id),
        ip_address: Some("203.0.113.9".to_string()),
    };
    let results = faq_service
        .search(
            FaqSearchQuery {
                q: Some("PAYMENTS".to_string()),
                ..Default::default()
            },
            &visitor,
        )
        .await
        .unwrap();
    assert_eq!(results.total, 1);
    assert_eq!(results.items[0].id, question.id);
    faq_service
        .search(FaqSearchQuery::default(), &visitor)
        .await
        .unwrap();

    faq_service
        .submit_feedback(
            &question.slug,
            FeedbackRequest {
                rating: 4,
                comment: "Clear".to_string(),
                is_helpful: Some(true),
            },
            &visitor,
        )
        .await
        .unwrap();
    let duplicate = faq_service
        .submit_feedback(
            &question.slug,
            FeedbackRequest {
                rating: 1,
                comment: String::new(),
                is_helpful: Some(false),
            },
            &visitor,
        )
        .await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));

    // No user and no address to key on
    faq_service
        .submit_feedback(
            &question.slug,
            FeedbackRequest {
                rating: 5,
                comment: String::new(),
                is_helpful: None,
            },
            &Visitor::default(),
        )
        .await
        .unwrap();

    let stats = faq_service.statistics().await.unwrap();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.drafts, 1);
    assert_eq!(stats.total_feedback, 2);
    assert_eq!(stats.total_searches, 1);
    assert_eq!(stats.average_rating, Some(4.5));
    assert_eq!(stats.helpful_count, 1);
    assert_eq!(stats.popular_searches[0].query, "PAYMENTS");
}

#[tokio::test]
async fn anonymous_feedback_is_limited_per_address() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let reader = app.register_user("reader", UserRole::User).await;
    let faq_service = &app.services().faq;
    let question = faq_service
        .create_question(None, faq(dir.category.id, "Can I pay by UPI", true))
        .await
        .unwrap();
    let rate = |rating| FeedbackRequest {
        rating,
        comment: String::new(),
        is_helpful: None,
    };
    let from_ip = |ip: &str| Visitor {
        user_id: None,
        ip_address: Some(ip.to_string()),
    };

    faq_service
        .submit_feedback(&question.slug, rate(5), &from_ip("198.51.100.7"))
        .await
        .unwrap();
    assert_matches!(
        faq_service
            .submit_feedback(&question.slug, rate(2), &from_ip("198.51.100.7"))
            .await,
        Err(ServiceError::Conflict(_))
    );
    faq_service
        .submit_feedback(&question.slug, rate(4), &from_ip("198.51.100.8"))
        .await
        .unwrap();

    // A signed-in reader on a shared address is keyed on the account
    let signed_in = Visitor {
        user_id: Some(reader.id),
        ip_address: Some("198.51.100.7".to_string()),
    };
    faq_service
        .submit_feedback(&question.slug, rate(3), &signed_in)
        .await
        .unwrap();

    let stats = faq_service.statistics().await.unwrap();
    assert_eq!(stats.total_feedback, 3);
}

fn post(title: &str, publish: bool) -> BlogPostRequest {
    BlogPostRequest {
        title: title.to_string(),
        content: format!("{title} in depth."),
        excerpt: String::new(),
        category_id: None,
        subcategory_id: None,
        country_id: None,
        state_id: None,
        city_id: None,
        district_id: None,
        region_id: None,
        is_published: publish,
        related_factory_ids: Vec::new(),
    }
}

#[tokio::test]
async fn blog_publish_keeps_the_first_publication_date() {
    let app = TestApp::new().await;
    let author = app.register_user("author", UserRole::User).await;
    let as_author = Actor {
        user_id: author.id,
        is_staff: false,
    };
    let blog = &app.services().blog;

    let draft = blog
        .create_post(author.id, post("Cotton prices this season", false))
        .await
        .unwrap();
    assert_eq!(draft.slug, "cotton-prices-this-season");
    assert_eq!(draft.published_at, None);
    assert_matches!(
        blog.get_published(&draft.slug).await,
        Err(ServiceError::NotFound(_))
    );

    let published = blog.publish(as_author, &draft.slug).await.unwrap();
    let first_published_at = published.published_at.expect("set on first publish");
    let hidden = blog.unpublish(as_author, &draft.slug).await.unwrap();
    assert!(!hidden.is_published);
    assert_eq!(hidden.published_at, Some(first_published_at));

    let again = blog.publish(as_author, &draft.slug).await.unwrap();
    assert!(again.is_published);
    assert_eq!(again.published_at, Some(first_published_at));

    let mut edit = post("Cotton prices this season", true);
    edit.content = "Revised.".to_string();
    let edited = blog
        .update_post(as_author, &draft.slug, edit)
        .await
        .unwrap();
    assert_eq!(edited.published_at, Some(first_published_at));
    assert_eq!(edited.content, "Revised.");
    assert!(blog.get_published(&draft.slug).await.is_ok());
}

#[tokio::test]
async fn blog_listing_counts_and_author_checks() {
    let app = TestApp::new().await;
    let dir = app.seed_directory().await;
    let author = app.register_user("author", UserRole::User).await;
    let other = app.register_user("other", UserRole::User).await;
    let staff = app.register_user("staff", UserRole::Staff).await;
    let as_author = Actor {
        user_id: author.id,
        is_staff: false,
    };
    let as_other = Actor {
        user_id: other.id,
        is_staff: false,
    };
    let as_staff = Actor {
        user_id: staff.id,
        is_staff: true,
    };
    let factory = app.create_factory(&dir, "Surat Silk House", dec!(500)).await;
    let blog = &app.services().blog;

    let mut live = post("Silk weaving in Surat", true);
    live.category_id = Some(dir.category.id);
    live.related_factory_ids = vec![factory.id, factory.id];
    let live = blog.create_post(author.id, live).await.unwrap();
    let draft = blog
        .create_post(author.id, post("Draft on dyes", false))
        .await
        .unwrap();
    let doomed = blog
        .create_post(author.id, post("Old announcement", true))
        .await
        .unwrap();

    assert_matches!(
        blog.update_post(as_other, &live.slug, post("Hijacked", true))
            .await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        blog.delete_post(as_other, &doomed.slug).await,
        Err(ServiceError::Forbidden(_))
    );
    blog.unpublish(as_staff, &draft.slug).await.unwrap();
    blog.delete_post(as_author, &doomed.slug).await.unwrap();

    let listed = blog.list_published(BlogFilter::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, live.id);
    let by_category = blog
        .list_published(BlogFilter {
            category_id: Some(dir.category.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_category.total, 1);
    let searched = blog
        .list_published(BlogFilter {
            q: Some("ANNOUNCEMENT".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.total, 0);

    let detail = blog.get_published(&live.slug).await.unwrap();
    assert_eq!(detail.related_factories.len(), 1);
    assert_eq!(detail.related_factories[0].id, factory.id);
    assert_eq!(blog.list_all().await.unwrap().len(), 2);

    assert_eq!(
        blog.statistics().await.unwrap(),
        BlogStatistics {
            total_posts: 3,
            published_posts: 1,
            draft_posts: 1,
            deleted_posts: 1,
        }
    );

    blog.restore_post(doomed.id).await.unwrap();
    let stats = blog.statistics().await.unwrap();
    assert_eq!(stats.published_posts, 2);
    assert_eq!(stats.deleted_posts, 0);
}
