use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_taxonomy_tables::Migration),
            Box::new(m20240101_000002_create_users_table::Migration),
            Box::new(m20240101_000003_create_directory_tables::Migration),
            Box::new(m20240101_000004_create_content_tables::Migration),
            Box::new(m20240101_000005_create_commerce_tables::Migration),
            Box::new(m20240101_000006_create_support_tables::Migration),
        ]
    }
}

/// Column helpers shared by the table migrations
mod columns {
    use sea_orm_migration::prelude::*;

    pub fn id() -> ColumnDef {
        ColumnDef::new(Alias::new("id"))
            .uuid()
            .primary_key()
            .not_null()
            .to_owned()
    }

    /// `created_at` / `updated_at`
    pub fn timestamps(table: &mut TableCreateStatement) {
        table
            .col(
                ColumnDef::new(Alias::new("created_at"))
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(
                ColumnDef::new(Alias::new("updated_at"))
                    .timestamp_with_time_zone()
                    .not_null(),
            );
    }

    /// `is_deleted` / `deleted_at`
    pub fn soft_delete(table: &mut TableCreateStatement) {
        table
            .col(
                ColumnDef::new(Alias::new("is_deleted"))
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(
                ColumnDef::new(Alias::new("deleted_at"))
                    .timestamp_with_time_zone()
                    .null(),
            );
    }

    pub fn text_default(name: &str) -> ColumnDef {
        ColumnDef::new(Alias::new(name))
            .string()
            .not_null()
            .default("")
            .to_owned()
    }

    pub fn money(name: &str) -> ColumnDef {
        ColumnDef::new(Alias::new(name))
            .decimal_len(12, 2)
            .not_null()
            .default(0)
            .to_owned()
    }

    pub async fn index(
        manager: &SchemaManager<'_>,
        name: &str,
        table: impl IntoIden + 'static,
        cols: &[&str],
        unique: bool,
    ) -> Result<(), DbErr> {
        let mut index = Index::create();
        index.if_not_exists().name(name).table(table);
        for col in cols {
            index.col(Alias::new(*col));
        }
        if unique {
            index.unique();
        }
        manager.create_index(index.to_owned()).await
    }
}

mod m20240101_000001_create_taxonomy_tables {
    use super::columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_taxonomy_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut categories = Table::create();
            categories
                .table(Categories::Table)
                .if_not_exists()
                .col(columns::id())
                .col(
                    ColumnDef::new(Categories::Name)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(
                    ColumnDef::new(Categories::Slug)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(columns::text_default("description"))
                .col(
                    ColumnDef::new(Categories::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                );
            columns::soft_delete(&mut categories);
            columns::timestamps(&mut categories);
            manager.create_table(categories.to_owned()).await?;

            let mut sub_categories = Table::create();
            sub_categories
                .table(SubCategories::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(SubCategories::CategoryId).uuid().not_null())
                .col(ColumnDef::new(SubCategories::Name).string().not_null())
                .col(
                    ColumnDef::new(SubCategories::Slug)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(columns::text_default("description"))
                .col(
                    ColumnDef::new(SubCategories::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sub_categories_category_id")
                        .from(SubCategories::Table, SubCategories::CategoryId)
                        .to(Categories::Table, Categories::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut sub_categories);
            columns::timestamps(&mut sub_categories);
            manager.create_table(sub_categories.to_owned()).await?;
            columns::index(
                manager,
                "uq_sub_categories_category_name",
                SubCategories::Table,
                &["category_id", "name"],
                true,
            )
            .await?;

            let mut countries = Table::create();
            countries
                .table(Countries::Table)
                .if_not_exists()
                .col(columns::id())
                .col(
                    ColumnDef::new(Countries::Name)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(
                    ColumnDef::new(Countries::Code)
                        .string_len(3)
                        .not_null()
                        .unique_key(),
                )
                .col(
                    ColumnDef::new(Countries::Slug)
                        .string()
                        .not_null()
                        .unique_key(),
                );
            columns::soft_delete(&mut countries);
            columns::timestamps(&mut countries);
            manager.create_table(countries.to_owned()).await?;

            let mut states = Table::create();
            states
                .table(States::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(States::CountryId).uuid().not_null())
                .col(ColumnDef::new(States::Name).string().not_null())
                .col(columns::text_default("code"))
                .col(ColumnDef::new(States::Slug).string().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_states_country_id")
                        .from(States::Table, States::CountryId)
                        .to(Countries::Table, Countries::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut states);
            columns::timestamps(&mut states);
            manager.create_table(states.to_owned()).await?;
            columns::index(
                manager,
                "uq_states_country_name",
                States::Table,
                &["country_id", "name"],
                true,
            )
            .await?;

            let mut cities = Table::create();
            cities
                .table(Cities::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(Cities::StateId).uuid().not_null())
                .col(ColumnDef::new(Cities::Name).string().not_null())
                .col(columns::text_default("code"))
                .col(ColumnDef::new(Cities::Slug).string().not_null())
                .col(
                    ColumnDef::new(Cities::IsCapital)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(ColumnDef::new(Cities::Population).big_integer().null())
                .col(ColumnDef::new(Cities::Area).decimal_len(10, 2).null())
                .col(ColumnDef::new(Cities::Latitude).decimal_len(9, 6).null())
                .col(ColumnDef::new(Cities::Longitude).decimal_len(9, 6).null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_cities_state_id")
                        .from(Cities::Table, Cities::StateId)
                        .to(States::Table, States::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut cities);
            columns::timestamps(&mut cities);
            manager.create_table(cities.to_owned()).await?;
            columns::index(
                manager,
                "uq_cities_state_name",
                Cities::Table,
                &["state_id", "name"],
                true,
            )
            .await?;

            let mut districts = Table::create();
            districts
                .table(Districts::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(Districts::CityId).uuid().not_null())
                .col(ColumnDef::new(Districts::Name).string().not_null())
                .col(columns::text_default("code"))
                .col(ColumnDef::new(Districts::Slug).string().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_districts_city_id")
                        .from(Districts::Table, Districts::CityId)
                        .to(Cities::Table, Cities::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut districts);
            columns::timestamps(&mut districts);
            manager.create_table(districts.to_owned()).await?;
            columns::index(
                manager,
                "uq_districts_city_name",
                Districts::Table,
                &["city_id", "name"],
                true,
            )
            .await?;

            let mut regions = Table::create();
            regions
                .table(Regions::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(Regions::DistrictId).uuid().not_null())
                .col(ColumnDef::new(Regions::Name).string().not_null())
                .col(columns::text_default("code"))
                .col(ColumnDef::new(Regions::Slug).string().not_null())
                .col(columns::text_default("description"))
                .col(
                    ColumnDef::new(Regions::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_regions_district_id")
                        .from(Regions::Table, Regions::DistrictId)
                        .to(Districts::Table, Districts::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut regions);
            columns::timestamps(&mut regions);
            manager.create_table(regions.to_owned()).await?;
            columns::index(
                manager,
                "uq_regions_district_name",
                Regions::Table,
                &["district_id", "name"],
                true,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Regions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Districts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Cities::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(States::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Countries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SubCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        Slug,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum SubCategories {
        Table,
        CategoryId,
        Name,
        Slug,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum Countries {
        Table,
        Id,
        Name,
        Code,
        Slug,
    }

    #[derive(DeriveIden)]
    enum States {
        Table,
        Id,
        CountryId,
        Name,
        Slug,
    }

    #[derive(DeriveIden)]
    enum Cities {
        Table,
        Id,
        StateId,
        Name,
        Slug,
        IsCapital,
        Population,
        Area,
        Latitude,
        Longitude,
    }

    #[derive(DeriveIden)]
    enum Districts {
        Table,
        Id,
        CityId,
        Name,
        Slug,
    }

    #[derive(DeriveIden)]
    enum Regions {
        Table,
        DistrictId,
        Name,
        Slug,
        IsActive,
    }
}

mod m20240101_000002_create_users_table {
    use super::columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut users = Table::create();
            users
                .table(Users::Table)
                .if_not_exists()
                .col(columns::id())
                .col(
                    ColumnDef::new(Users::Username)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(
                    ColumnDef::new(Users::Email)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(columns::text_default("first_name"))
                .col(columns::text_default("last_name"))
                .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                .col(
                    ColumnDef::new(Users::Role)
                        .string_len(16)
                        .not_null()
                        .default("user"),
                )
                .col(columns::text_default("phone_number"))
                .col(
                    ColumnDef::new(Users::EmailNotifications)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(Users::FailedLoginAttempts)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(Users::LockedUntil)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Users::LastPasswordChange)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Users::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                );
            columns::timestamps(&mut users);
            manager.create_table(users.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Username,
        Email,
        PasswordHash,
        Role,
        EmailNotifications,
        FailedLoginAttempts,
        LockedUntil,
        LastPasswordChange,
        IsActive,
    }
}

mod m20240101_000003_create_directory_tables {
    use super::columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_directory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut factories = Table::create();
            factories
                .table(Factories::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(Factories::Name).string().not_null())
                .col(
                    ColumnDef::new(Factories::Slug)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(
                    ColumnDef::new(Factories::Description)
                        .text()
                        .not_null()
                        .default(""),
                )
                .col(ColumnDef::new(Factories::CategoryId).uuid().not_null())
                .col(ColumnDef::new(Factories::SubcategoryId).uuid().null())
                .col(ColumnDef::new(Factories::CountryId).uuid().not_null())
                .col(ColumnDef::new(Factories::StateId).uuid().not_null())
                .col(ColumnDef::new(Factories::CityId).uuid().not_null())
                .col(ColumnDef::new(Factories::DistrictId).uuid().null())
                .col(ColumnDef::new(Factories::RegionId).uuid().null())
                .col(columns::text_default("address"))
                .col(columns::text_default("pincode"))
                .col(columns::text_default("contact_person"))
                .col(columns::text_default("contact_phone"))
                .col(columns::text_default("contact_email"))
                .col(columns::text_default("website"))
                .col(ColumnDef::new(Factories::EstablishedYear).integer().null())
                .col(ColumnDef::new(Factories::EmployeeCount).integer().null())
                .col(
                    ColumnDef::new(Factories::AnnualTurnover)
                        .decimal_len(15, 2)
                        .null(),
                )
                .col(columns::text_default("factory_type"))
                .col(columns::text_default("production_capacity"))
                .col(columns::text_default("working_hours"))
                .col(columns::text_default("holidays"))
                .col(columns::money("price"))
                .col(
                    ColumnDef::new(Factories::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(Factories::IsVerified)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_factories_category_id")
                        .from(Factories::Table, Factories::CategoryId)
                        .to(Categories::Table, Categories::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_factories_city_id")
                        .from(Factories::Table, Factories::CityId)
                        .to(Cities::Table, Cities::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut factories);
            columns::timestamps(&mut factories);
            manager.create_table(factories.to_owned()).await?;
            columns::index(
                manager,
                "idx_factories_category_id",
                Factories::Table,
                &["category_id"],
                false,
            )
            .await?;
            columns::index(
                manager,
                "idx_factories_is_deleted",
                Factories::Table,
                &["is_deleted"],
                false,
            )
            .await?;

            let mut workers = Table::create();
            workers
                .table(Workers::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(Workers::FullName).string().not_null())
                .col(ColumnDef::new(Workers::DateOfBirth).date().null())
                .col(
                    ColumnDef::new(Workers::Gender)
                        .string_len(1)
                        .not_null()
                        .default("N"),
                )
                .col(columns::text_default("phone_number"))
                .col(columns::text_default("email"))
                .col(ColumnDef::new(Workers::CategoryId).uuid().not_null())
                .col(ColumnDef::new(Workers::SubcategoryId).uuid().null())
                .col(
                    ColumnDef::new(Workers::YearsOfExperience)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(columns::text_default("skills"))
                .col(
                    ColumnDef::new(Workers::Availability)
                        .string_len(2)
                        .not_null()
                        .default("A"),
                )
                .col(
                    ColumnDef::new(Workers::ExpectedDailyWage)
                        .decimal_len(10, 2)
                        .not_null()
                        .default(0),
                )
                .col(ColumnDef::new(Workers::CountryId).uuid().null())
                .col(ColumnDef::new(Workers::StateId).uuid().null())
                .col(ColumnDef::new(Workers::CityId).uuid().null())
                .col(ColumnDef::new(Workers::DistrictId).uuid().null())
                .col(ColumnDef::new(Workers::RegionId).uuid().null())
                .col(columns::text_default("address"))
                .col(
                    ColumnDef::new(Workers::Slug)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(
                    ColumnDef::new(Workers::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(Workers::IsVerified)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(ColumnDef::new(Workers::CreatedBy).uuid().null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_workers_category_id")
                        .from(Workers::Table, Workers::CategoryId)
                        .to(Categories::Table, Categories::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut workers);
            columns::timestamps(&mut workers);
            manager.create_table(workers.to_owned()).await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkExperiences::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(WorkExperiences::WorkerId).uuid().not_null())
                        .col(
                            ColumnDef::new(WorkExperiences::CompanyName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkExperiences::JobTitle).string().not_null())
                        .col(ColumnDef::new(WorkExperiences::StartDate).date().not_null())
                        .col(ColumnDef::new(WorkExperiences::EndDate).date().null())
                        .col(columns::text_default("description"))
                        .col(
                            ColumnDef::new(WorkExperiences::IsCurrent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_experiences_worker_id")
                                .from(WorkExperiences::Table, WorkExperiences::WorkerId)
                                .to(Workers::Table, Workers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkExperiences::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Workers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Factories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Cities {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Factories {
        Table,
        Name,
        Slug,
        Description,
        CategoryId,
        SubcategoryId,
        CountryId,
        StateId,
        CityId,
        DistrictId,
        RegionId,
        EstablishedYear,
        EmployeeCount,
        AnnualTurnover,
        IsActive,
        IsVerified,
    }

    #[derive(DeriveIden)]
    enum Workers {
        Table,
        Id,
        FullName,
        DateOfBirth,
        Gender,
        CategoryId,
        SubcategoryId,
        YearsOfExperience,
        Availability,
        ExpectedDailyWage,
        CountryId,
        StateId,
        CityId,
        DistrictId,
        RegionId,
        Slug,
        IsActive,
        IsVerified,
        CreatedBy,
    }

    #[derive(DeriveIden)]
    enum WorkExperiences {
        Table,
        WorkerId,
        CompanyName,
        JobTitle,
        StartDate,
        EndDate,
        IsCurrent,
    }
}

mod m20240101_000004_create_content_tables {
    use super::columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_content_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut posts = Table::create();
            posts
                .table(BlogPosts::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(BlogPosts::Title).string().not_null())
                .col(
                    ColumnDef::new(BlogPosts::Slug)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(BlogPosts::Content).text().not_null())
                .col(columns::text_default("excerpt"))
                .col(ColumnDef::new(BlogPosts::AuthorId).uuid().null())
                .col(ColumnDef::new(BlogPosts::CategoryId).uuid().null())
                .col(ColumnDef::new(BlogPosts::SubcategoryId).uuid().null())
                .col(ColumnDef::new(BlogPosts::CountryId).uuid().null())
                .col(ColumnDef::new(BlogPosts::StateId).uuid().null())
                .col(ColumnDef::new(BlogPosts::CityId).uuid().null())
                .col(ColumnDef::new(BlogPosts::DistrictId).uuid().null())
                .col(ColumnDef::new(BlogPosts::RegionId).uuid().null())
                .col(
                    ColumnDef::new(BlogPosts::IsPublished)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(
                    ColumnDef::new(BlogPosts::PublishedAt)
                        .timestamp_with_time_zone()
                        .null(),
                );
            columns::soft_delete(&mut posts);
            columns::timestamps(&mut posts);
            manager.create_table(posts.to_owned()).await?;
            columns::index(
                manager,
                "idx_blog_posts_is_published",
                BlogPosts::Table,
                &["is_published"],
                false,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BlogPostFactories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BlogPostFactories::BlogPostId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BlogPostFactories::FactoryId)
                                .uuid()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(BlogPostFactories::BlogPostId)
                                .col(BlogPostFactories::FactoryId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_blog_post_factories_post")
                                .from(BlogPostFactories::Table, BlogPostFactories::BlogPostId)
                                .to(BlogPosts::Table, BlogPosts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_blog_post_factories_factory")
                                .from(BlogPostFactories::Table, BlogPostFactories::FactoryId)
                                .to(Factories::Table, Factories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            let mut questions = Table::create();
            questions
                .table(FaqQuestions::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(FaqQuestions::Title).string().not_null())
                .col(
                    ColumnDef::new(FaqQuestions::Slug)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(FaqQuestions::CategoryId).uuid().not_null())
                .col(ColumnDef::new(FaqQuestions::QuestionText).text().not_null())
                .col(ColumnDef::new(FaqQuestions::AnswerText).text().not_null())
                .col(
                    ColumnDef::new(FaqQuestions::Status)
                        .string_len(20)
                        .not_null()
                        .default("draft"),
                )
                .col(
                    ColumnDef::new(FaqQuestions::IsFeatured)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(
                    ColumnDef::new(FaqQuestions::ViewCount)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(columns::text_default("tags"))
                .col(
                    ColumnDef::new(FaqQuestions::SortOrder)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(ColumnDef::new(FaqQuestions::CreatedBy).uuid().null())
                .col(ColumnDef::new(FaqQuestions::UpdatedBy).uuid().null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_faq_questions_category_id")
                        .from(FaqQuestions::Table, FaqQuestions::CategoryId)
                        .to(Categories::Table, Categories::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::soft_delete(&mut questions);
            columns::timestamps(&mut questions);
            manager.create_table(questions.to_owned()).await?;
            columns::index(
                manager,
                "idx_faq_questions_status_featured",
                FaqQuestions::Table,
                &["status", "is_featured"],
                false,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FaqFeedback::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(FaqFeedback::QuestionId).uuid().not_null())
                        .col(ColumnDef::new(FaqFeedback::UserId).uuid().null())
                        .col(ColumnDef::new(FaqFeedback::Rating).integer().not_null())
                        .col(columns::text_default("comment"))
                        .col(ColumnDef::new(FaqFeedback::IsHelpful).boolean().null())
                        .col(ColumnDef::new(FaqFeedback::IpAddress).string().null())
                        .col(
                            ColumnDef::new(FaqFeedback::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_faq_feedback_question_id")
                                .from(FaqFeedback::Table, FaqFeedback::QuestionId)
                                .to(FaqQuestions::Table, FaqQuestions::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;
            columns::index(
                manager,
                "uq_faq_feedback_question_user",
                FaqFeedback::Table,
                &["question_id", "user_id"],
                true,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FaqSearchLogs::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(FaqSearchLogs::SearchQuery).string().not_null())
                        .col(
                            ColumnDef::new(FaqSearchLogs::ResultsCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(FaqSearchLogs::IpAddress).string().null())
                        .col(ColumnDef::new(FaqSearchLogs::UserId).uuid().null())
                        .col(
                            ColumnDef::new(FaqSearchLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FaqSearchLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FaqFeedback::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FaqQuestions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BlogPostFactories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BlogPosts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Factories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum BlogPosts {
        Table,
        Id,
        Title,
        Slug,
        Content,
        AuthorId,
        CategoryId,
        SubcategoryId,
        CountryId,
        StateId,
        CityId,
        DistrictId,
        RegionId,
        IsPublished,
        PublishedAt,
    }

    #[derive(DeriveIden)]
    enum BlogPostFactories {
        Table,
        BlogPostId,
        FactoryId,
    }

    #[derive(DeriveIden)]
    enum FaqQuestions {
        Table,
        Id,
        Title,
        Slug,
        CategoryId,
        QuestionText,
        AnswerText,
        Status,
        IsFeatured,
        ViewCount,
        SortOrder,
        CreatedBy,
        UpdatedBy,
    }

    #[derive(DeriveIden)]
    enum FaqFeedback {
        Table,
        QuestionId,
        UserId,
        Rating,
        IsHelpful,
        IpAddress,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum FaqSearchLogs {
        Table,
        SearchQuery,
        ResultsCount,
        IpAddress,
        UserId,
        CreatedAt,
    }
}

mod m20240101_000005_create_commerce_tables {
    use super::columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_commerce_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ShoppingCartItems::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(ShoppingCartItems::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(ShoppingCartItems::FactoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItems::AddedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shopping_cart_items_user_id")
                                .from(ShoppingCartItems::Table, ShoppingCartItems::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shopping_cart_items_factory_id")
                                .from(ShoppingCartItems::Table, ShoppingCartItems::FactoryId)
                                .to(Factories::Table, Factories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;
            columns::index(
                manager,
                "uq_shopping_cart_items_user_factory",
                ShoppingCartItems::Table,
                &["user_id", "factory_id"],
                true,
            )
            .await?;

            let mut orders = Table::create();
            orders
                .table(Orders::Table)
                .if_not_exists()
                .col(columns::id())
                .col(
                    ColumnDef::new(Orders::OrderNumber)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                .col(columns::text_default("customer_name"))
                .col(columns::text_default("customer_email"))
                .col(columns::text_default("customer_phone"))
                .col(columns::money("subtotal"))
                .col(columns::money("tax_amount"))
                .col(columns::money("service_fee"))
                .col(columns::money("total_amount"))
                .col(
                    ColumnDef::new(Orders::Status)
                        .string_len(20)
                        .not_null()
                        .default("pending"),
                )
                .col(
                    ColumnDef::new(Orders::PaymentStatus)
                        .string_len(20)
                        .not_null()
                        .default("pending"),
                )
                .col(columns::text_default("payment_method"))
                .col(columns::text_default("notes"))
                .col(ColumnDef::new(Orders::TrackingNumber).string().null())
                .col(
                    ColumnDef::new(Orders::MigratedFromPurchase)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(
                    ColumnDef::new(Orders::CompletedAt)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_orders_user_id")
                        .from(Orders::Table, Orders::UserId)
                        .to(Users::Table, Users::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::timestamps(&mut orders);
            manager.create_table(orders.to_owned()).await?;
            columns::index(
                manager,
                "idx_orders_user_id",
                Orders::Table,
                &["user_id"],
                false,
            )
            .await?;
            columns::index(
                manager,
                "idx_orders_status",
                Orders::Table,
                &["status"],
                false,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::FactoryId).uuid().null())
                        .col(columns::text_default("factory_name"))
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(columns::money("price_at_purchase"))
                        .col(columns::money("total_price"))
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_factory_id")
                                .from(OrderItems::Table, OrderItems::FactoryId)
                                .to(Factories::Table, Factories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            let mut payments = Table::create();
            payments
                .table(Payments::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(Payments::OrderId).uuid().not_null())
                .col(ColumnDef::new(Payments::PaymentMethod).string().not_null())
                .col(columns::money("amount"))
                .col(
                    ColumnDef::new(Payments::Currency)
                        .string_len(3)
                        .not_null()
                        .default("INR"),
                )
                .col(
                    ColumnDef::new(Payments::Status)
                        .string_len(20)
                        .not_null()
                        .default("pending"),
                )
                .col(
                    ColumnDef::new(Payments::TransactionId)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(Payments::GatewayResponse).json().null())
                .col(ColumnDef::new(Payments::GatewayError).string().null())
                .col(columns::money("refunded_amount"))
                .col(ColumnDef::new(Payments::RefundReason).string().null())
                .col(
                    ColumnDef::new(Payments::RefundedAt)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Payments::CompletedAt)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_payments_order_id")
                        .from(Payments::Table, Payments::OrderId)
                        .to(Orders::Table, Orders::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            columns::timestamps(&mut payments);
            manager.create_table(payments.to_owned()).await?;

            manager
                .create_table(
                    Table::create()
                        .table(FactoryPurchases::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(FactoryPurchases::UserId).uuid().not_null())
                        .col(ColumnDef::new(FactoryPurchases::FactoryId).uuid().not_null())
                        .col(
                            ColumnDef::new(FactoryPurchases::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(columns::money("price_at_purchase"))
                        .col(
                            ColumnDef::new(FactoryPurchases::PaymentStatus)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(FactoryPurchases::TransactionId).string().null())
                        .col(
                            ColumnDef::new(FactoryPurchases::PurchasedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FactoryPurchases::EmailSent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(FactoryPurchases::EmailSentAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FactoryPurchases::MigratedToOrder)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_factory_purchases_user_id")
                                .from(FactoryPurchases::Table, FactoryPurchases::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_factory_purchases_factory_id")
                                .from(FactoryPurchases::Table, FactoryPurchases::FactoryId)
                                .to(Factories::Table, Factories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;
            columns::index(
                manager,
                "idx_factory_purchases_user_factory",
                FactoryPurchases::Table,
                &["user_id", "factory_id"],
                false,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseHistory::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(PurchaseHistory::UserId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseHistory::FactoryId).uuid().null())
                        .col(ColumnDef::new(PurchaseHistory::PurchaseId).uuid().null())
                        .col(ColumnDef::new(PurchaseHistory::OrderId).uuid().null())
                        .col(columns::text_default("factory_name"))
                        .col(columns::text_default("factory_slug"))
                        .col(columns::text_default("factory_contact_email"))
                        .col(columns::text_default("factory_contact_phone"))
                        .col(columns::text_default("factory_address"))
                        .col(
                            ColumnDef::new(PurchaseHistory::FactoryDescription)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(columns::money("price_paid"))
                        .col(
                            ColumnDef::new(PurchaseHistory::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(PurchaseHistory::PurchaseDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseHistory::EmailDelivered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PurchaseHistory::EmailDeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_history_user_id")
                                .from(PurchaseHistory::Table, PurchaseHistory::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_history_factory_id")
                                .from(PurchaseHistory::Table, PurchaseHistory::FactoryId)
                                .to(Factories::Table, Factories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FactoryPurchases::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ShoppingCartItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Factories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum ShoppingCartItems {
        Table,
        UserId,
        FactoryId,
        Quantity,
        AddedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        UserId,
        Status,
        PaymentStatus,
        TrackingNumber,
        MigratedFromPurchase,
        CompletedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        OrderId,
        FactoryId,
        Quantity,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        OrderId,
        PaymentMethod,
        Currency,
        Status,
        TransactionId,
        GatewayResponse,
        GatewayError,
        RefundReason,
        RefundedAt,
        CompletedAt,
    }

    #[derive(DeriveIden)]
    enum FactoryPurchases {
        Table,
        UserId,
        FactoryId,
        Quantity,
        PaymentStatus,
        TransactionId,
        PurchasedAt,
        EmailSent,
        EmailSentAt,
        MigratedToOrder,
    }

    #[derive(DeriveIden)]
    enum PurchaseHistory {
        Table,
        UserId,
        FactoryId,
        PurchaseId,
        OrderId,
        FactoryDescription,
        Quantity,
        PurchaseDate,
        EmailDelivered,
        EmailDeliveredAt,
    }
}

mod m20240101_000006_create_support_tables {
    use super::columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_support_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PasswordResetTokens::Table)
                        .if_not_exists()
                        .col(columns::id())
                        .col(ColumnDef::new(PasswordResetTokens::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(PasswordResetTokens::TokenHash)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::UsedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_password_reset_tokens_user_id")
                                .from(PasswordResetTokens::Table, PasswordResetTokens::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            let mut contacts = Table::create();
            contacts
                .table(ContactMessages::Table)
                .if_not_exists()
                .col(columns::id())
                .col(ColumnDef::new(ContactMessages::Name).string_len(100).not_null())
                .col(ColumnDef::new(ContactMessages::Email).string().not_null())
                .col(ColumnDef::new(ContactMessages::Subject).string_len(200).not_null())
                .col(ColumnDef::new(ContactMessages::Message).text().not_null())
                .col(ColumnDef::new(ContactMessages::UserId).uuid().null())
                .col(
                    ColumnDef::new(ContactMessages::IsRead)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(
                    ColumnDef::new(ContactMessages::ReadAt)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_contact_messages_user_id")
                        .from(ContactMessages::Table, ContactMessages::UserId)
                        .to(Users::Table, Users::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                );
            columns::soft_delete(&mut contacts);
            columns::timestamps(&mut contacts);
            manager.create_table(contacts.to_owned()).await?;
            columns::index(
                manager,
                "idx_contact_messages_is_read",
                ContactMessages::Table,
                &["is_read", "created_at"],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ContactMessages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PasswordResetTokens::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum PasswordResetTokens {
        Table,
        UserId,
        TokenHash,
        ExpiresAt,
        CreatedAt,
        UsedAt,
    }

    #[derive(DeriveIden)]
    enum ContactMessages {
        Table,
        Name,
        Email,
        Subject,
        Message,
        UserId,
        IsRead,
        ReadAt,
    }
}
