//! Book catalog behaviour against the in-memory backend

mod common;

use biblion::{
    error::AppError,
    models::{BookFilter, PageRequest, UpdateBook},
};
use common::{context, new_book, seed_book, seed_loan_on, date};

#[tokio::test]
async fn create_assigns_ids_and_stores_fields() {
    let ctx = context();

    let first = seed_book(&ctx, "Clean Code", "978-0132350884").await;
    let second = seed_book(&ctx, "Refactoring", "978-0134757599").await;

    assert_ne!(first.id, second.id);
    let fetched = ctx.services.books.get_by_id(first.id).await.unwrap();
    assert_eq!(fetched, Some(first));
}

#[tokio::test]
async fn duplicate_isbn_is_rejected() {
    let ctx = context();
    seed_book(&ctx, "Clean Code", "978-0132350884").await;

    let result = ctx
        .services
        .books
        .create(new_book("Another", "Someone", "978-0132350884"))
        .await;

    assert!(matches!(result, Err(AppError::DuplicateIsbn(_))));
}

#[tokio::test]
async fn lookup_by_isbn() {
    let ctx = context();
    let book = seed_book(&ctx, "Dune", "978-0441013593").await;

    let found = ctx.services.books.get_by_isbn("978-0441013593").await.unwrap();
    assert_eq!(found, Some(book));
    assert!(ctx.services.books.get_by_isbn("unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn update_changes_title_and_author_only() {
    let ctx = context();
    let book = seed_book(&ctx, "Clean Code", "978-0132350884").await;

    let updated = ctx
        .services
        .books
        .update(
            book.id,
            UpdateBook {
                title: "Clean Code, 2nd ed.".to_string(),
                author: "Uncle Bob".to_string(),
                isbn: Some("000".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, book.id);
    assert_eq!(updated.title, "Clean Code, 2nd ed.");
    assert_eq!(updated.author, "Uncle Bob");
    assert_eq!(updated.isbn, "978-0132350884");
}

#[tokio::test]
async fn update_unknown_book_is_not_found() {
    let ctx = context();

    let result = ctx
        .services
        .books
        .update(
            42,
            UpdateBook {
                title: "T".to_string(),
                author: "A".to_string(),
                isbn: None,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_removes_book_without_loans() {
    let ctx = context();
    let book = seed_book(&ctx, "Dune", "978-0441013593").await;

    ctx.services.books.delete(book.id).await.unwrap();

    assert!(ctx.services.books.get_by_id(book.id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_keeps_book_with_loan_history() {
    let ctx = context();
    let active = seed_book(&ctx, "Dune", "978-0441013593").await;
    let returned = seed_book(&ctx, "Emma", "978-0141439587").await;
    let active_loan = seed_loan_on(&ctx, &active, "Alice", "alice@example.com", date(2024, 3, 1)).await;
    let returned_loan = seed_loan_on(&ctx, &returned, "Bob", "bob@example.com", date(2024, 3, 1)).await;
    ctx.services.loans.mark_returned(returned_loan, true).await.unwrap();

    for book in [&active, &returned] {
        let result = ctx.services.books.delete(book.id).await;
        assert!(matches!(result, Err(AppError::BookHasLoans(_))));
        assert!(ctx.services.books.get_by_id(book.id).await.unwrap().is_some());
    }
    assert!(ctx.services.loans.get_by_id(active_loan).await.unwrap().is_some());
    assert!(ctx.services.loans.get_by_id(returned_loan).await.unwrap().is_some());
}

#[tokio::test]
async fn repository_refuses_to_drop_loaned_book() {
    let ctx = context();
    let book = seed_book(&ctx, "Dune", "978-0441013593").await;
    seed_loan_on(&ctx, &book, "Alice", "alice@example.com", date(2024, 3, 1)).await;

    let result = ctx.repository.books.delete(book.id).await;
    assert!(matches!(result, Err(AppError::BookHasLoans(_))));
}

#[tokio::test]
async fn delete_unknown_book_is_not_found() {
    let ctx = context();
    let result = ctx.services.books.delete(7).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn find_by_example_filters_and_pages() {
    let ctx = context();
    seed_book(&ctx, "The Rust Programming Language", "111").await;
    seed_book(&ctx, "Rust in Action", "222").await;
    seed_book(&ctx, "Programming Rust", "333").await;
    seed_book(&ctx, "Dune", "444").await;

    let filter = BookFilter {
        title: Some("rust".to_string()),
        ..Default::default()
    };
    let page = PageRequest::new(Some(1), Some(2)).unwrap();
    let first = ctx.services.books.find(&filter, &page).await.unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].isbn, "111");

    let page = PageRequest::new(Some(2), Some(2)).unwrap();
    let second = ctx.services.books.find(&filter, &page).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].isbn, "333");
}

#[tokio::test]
async fn empty_filter_lists_everything() {
    let ctx = context();
    seed_book(&ctx, "Dune", "444").await;
    seed_book(&ctx, "Emma", "555").await;

    let all = ctx
        .services
        .books
        .find(&BookFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
}
