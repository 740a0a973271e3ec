//! Dependency Classification
//!
//! Fixed lookup table mapping manifest dependency names to a stack category.
//! Only exact (case-insensitive) name matches count; scoped packages match
//! on their full name (`@nestjs/core`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackCategory {
    Frontend,
    Backend,
    Database,
    Tools,
}

/// `(dependency name, display name, category)`
const CLASSIFICATION: &[(&str, &str, StackCategory)] = &[
    // Frontend
    ("react", "React", StackCategory::Frontend),
    ("react-dom", "React", StackCategory::Frontend),
    ("next", "Next.js", StackCategory::Frontend),
    ("vue", "Vue", StackCategory::Frontend),
    ("nuxt", "Nuxt", StackCategory::Frontend),
    ("svelte", "Svelte", StackCategory::Frontend),
    ("@sveltejs/kit", "SvelteKit", StackCategory::Frontend),
    ("@angular/core", "Angular", StackCategory::Frontend),
    ("solid-js", "Solid", StackCategory::Frontend),
    ("preact", "Preact", StackCategory::Frontend),
    ("tailwindcss", "Tailwind CSS", StackCategory::Frontend),
    ("streamlit", "Streamlit", StackCategory::Frontend),
    // Backend
    ("express", "Express", StackCategory::Backend),
    ("fastify", "Fastify", StackCategory::Backend),
    ("koa", "Koa", StackCategory::Backend),
    ("hapi", "hapi", StackCategory::Backend),
    ("@hapi/hapi", "hapi", StackCategory::Backend),
    ("@nestjs/core", "NestJS", StackCategory::Backend),
    ("@nestjs/common", "NestJS", StackCategory::Backend),
    ("hono", "Hono", StackCategory::Backend),
    ("fastapi", "FastAPI", StackCategory::Backend),
    ("flask", "Flask", StackCategory::Backend),
    ("django", "Django", StackCategory::Backend),
    ("starlette", "Starlette", StackCategory::Backend),
    ("aiohttp", "aiohttp", StackCategory::Backend),
    ("uvicorn", "Uvicorn", StackCategory::Backend),
    ("gunicorn", "Gunicorn", StackCategory::Backend),
    // Database
    ("pg", "PostgreSQL", StackCategory::Database),
    ("postgres", "PostgreSQL", StackCategory::Database),
    ("psycopg2", "PostgreSQL", StackCategory::Database),
    ("psycopg2-binary", "PostgreSQL", StackCategory::Database),
    ("psycopg", "PostgreSQL", StackCategory::Database),
    ("asyncpg", "PostgreSQL", StackCategory::Database),
    ("mysql", "MySQL", StackCategory::Database),
    ("mysql2", "MySQL", StackCategory::Database),
    ("pymysql", "MySQL", StackCategory::Database),
    ("sqlite3", "SQLite", StackCategory::Database),
    ("better-sqlite3", "SQLite", StackCategory::Database),
    ("mongodb", "MongoDB", StackCategory::Database),
    ("mongoose", "MongoDB", StackCategory::Database),
    ("pymongo", "MongoDB", StackCategory::Database),
    ("motor", "MongoDB", StackCategory::Database),
    ("redis", "Redis", StackCategory::Database),
    ("ioredis", "Redis", StackCategory::Database),
    ("prisma", "Prisma", StackCategory::Database),
    ("@prisma/client", "Prisma", StackCategory::Database),
    ("typeorm", "TypeORM", StackCategory::Database),
    ("sequelize", "Sequelize", StackCategory::Database),
    ("drizzle-orm", "Drizzle", StackCategory::Database),
    ("knex", "Knex", StackCategory::Database),
    ("sqlalchemy", "SQLAlchemy", StackCategory::Database),
    ("@supabase/supabase-js", "Supabase", StackCategory::Database),
    ("supabase", "Supabase", StackCategory::Database),
    ("firebase", "Firebase", StackCategory::Database),
    // Tooling
    ("typescript", "TypeScript", StackCategory::Tools),
    ("vite", "Vite", StackCategory::Tools),
    ("webpack", "webpack", StackCategory::Tools),
    ("esbuild", "esbuild", StackCategory::Tools),
    ("rollup", "Rollup", StackCategory::Tools),
    ("babel", "Babel", StackCategory::Tools),
    ("@babel/core", "Babel", StackCategory::Tools),
    ("eslint", "ESLint", StackCategory::Tools),
    ("prettier", "Prettier", StackCategory::Tools),
    ("jest", "Jest", StackCategory::Tools),
    ("vitest", "Vitest", StackCategory::Tools),
    ("mocha", "Mocha", StackCategory::Tools),
    ("playwright", "Playwright", StackCategory::Tools),
    ("@playwright/test", "Playwright", StackCategory::Tools),
    ("cypress", "Cypress", StackCategory::Tools),
    ("nodemon", "nodemon", StackCategory::Tools),
    ("pytest", "pytest", StackCategory::Tools),
    ("black", "Black", StackCategory::Tools),
    ("ruff", "Ruff", StackCategory::Tools),
    ("mypy", "mypy", StackCategory::Tools),
    ("flake8", "Flake8", StackCategory::Tools),
    ("poetry", "Poetry", StackCategory::Tools),
];

/// Classify a dependency by exact name; returns the display name and category
pub fn classify(dependency: &str) -> Option<(&'static str, StackCategory)> {
    let lower = dependency.trim().to_ascii_lowercase();
    CLASSIFICATION
        .iter()
        .find(|(name, _, _)| *name == lower)
        .map(|(_, display, category)| (*display, *category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_only() {
        assert_eq!(classify("express"), Some(("Express", StackCategory::Backend)));
        assert_eq!(classify("Flask"), Some(("Flask", StackCategory::Backend)));
        assert_eq!(classify("express-session"), None);
        assert_eq!(classify("@nestjs/core"), Some(("NestJS", StackCategory::Backend)));
    }

    #[test]
    fn test_categories() {
        assert_eq!(classify("react").map(|c| c.1), Some(StackCategory::Frontend));
        assert_eq!(classify("mongoose").map(|c| c.1), Some(StackCategory::Database));
        assert_eq!(classify("jest").map(|c| c.1), Some(StackCategory::Tools));
    }

    #[test]
    fn test_table_has_no_duplicate_keys() {
        let mut names: Vec<&str> = CLASSIFICATION.iter().map(|(n, _, _)| *n).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}
