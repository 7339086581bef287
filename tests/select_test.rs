mod common;

use common::*;
use paramquery::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_student_end_to_end() {
    let built = school_query()
        .select(["s.Id", "s.FirstName"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(gt(col("s.Id"), 0) & eq(col("s.FirstName"), "Steve"))
        .build()
        .expect("query builds");

    let query = "select\n\
                 \ts.student_id,\n\
                 \ts.first_name\n\
                 from\n\
                 \tPQ_Student as s\n\
                 where\n\
                 \ts.student_id > 0\n\
                 \tand s.first_name = @param_value_1\n";
    assert_eq!(built.parameterized_query, query);
    assert_eq!(built.command.text, query);
    assert_eq!(
        built.command.parameters,
        vec![Parameter::new("@param_value_1", "Steve", ParamKind::NVarChar)]
    );
    assert_eq!(
        built.runnable_script,
        format!(
            "declare @param_value_1 nvarchar(300)\n\nselect @param_value_1 = 'Steve'\n\n{}",
            query
        )
    );
}

#[test]
fn test_and_inside_or() {
    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter((gt(col("s.Id"), 0) & eq(col("s.FirstName"), "Steve")) | eq(col("s.LastName"), "Smith"))
        .build()
        .unwrap();
    assert_eq!(
        where_block(&built.parameterized_query),
        "\t(\n\
         \t\ts.student_id > 0\n\
         \t\tand s.first_name = @param_value_1\n\
         \t)\n\
         \tor s.last_name = @param_value_2\n"
    );
}

#[test]
fn test_or_inside_and() {
    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(gt(col("s.Id"), 0) & (eq(col("s.FirstName"), "Steve") | eq(col("s.LastName"), "Smith")))
        .build()
        .unwrap();
    assert_eq!(
        where_block(&built.parameterized_query),
        "\ts.student_id > 0\n\
         \tand\n\
         \t(\n\
         \t\ts.first_name = @param_value_1\n\
         \t\tor s.last_name = @param_value_2\n\
         \t)\n"
    );
}

#[test]
fn test_null_variable_is_stripped() {
    let first_name = "Steve";
    let last_name: Option<String> = None;

    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(
            eq(col("s.FirstName"), capture!(first_name)) & eq(col("s.LastName"), capture!(last_name)),
        )
        .build()
        .unwrap();
    assert_eq!(where_block(&built.parameterized_query), "\ts.first_name = @param_first_name\n");
    assert_eq!(built.command.parameters.len(), 1);

    // null first: the remaining condition loses its connective
    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(
            eq(col("s.LastName"), capture!(last_name)) & eq(col("s.FirstName"), capture!(first_name)),
        )
        .build()
        .unwrap();
    assert_eq!(where_block(&built.parameterized_query), "\ts.first_name = @param_first_name\n");
}

#[test]
fn test_all_null_drops_where_clause() {
    let first_name: Option<&str> = None;
    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(
            gt(col("s.Id"), 0)
                & (eq(col("s.FirstName"), capture!(first_name))
                    | like(col("s.LastName"), PatternSource::Text(None))),
        )
        .build()
        .unwrap();
    assert_eq!(
        built.parameterized_query,
        "select\n\ts.student_id\nfrom\n\tPQ_Student as s\nwhere\n\ts.student_id > 0\n"
    );

    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(eq(col("s.FirstName"), capture!(first_name)))
        .build()
        .unwrap();
    assert!(!built.parameterized_query.contains("where"));
}

#[test]
fn test_null_variable_as_is_null() {
    let last_name: Option<&str> = None;
    let built = school_query()
        .with_options(BuildOptions::default().with_ignore_null_filter_values(false))
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(eq(col("s.LastName"), capture!(last_name)))
        .build()
        .unwrap();
    assert_eq!(where_block(&built.parameterized_query), "\ts.last_name is null\n");
}

#[test]
fn test_empty_in_list() {
    let empty: Vec<i64> = Vec::new();
    let err = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(is_in(col("s.Id"), empty.clone()))
        .build()
        .unwrap_err();
    assert!(matches!(err, QueryError::Usage(_)));

    let built = school_query()
        .with_options(BuildOptions::default().with_empty_in_list(EmptyListPolicy::Render))
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(is_in(col("s.Id"), empty))
        .build()
        .unwrap();
    assert_eq!(where_block(&built.parameterized_query), "\ts.student_id in ()\n");
}

#[test]
fn test_duplicate_alias() {
    let err = ParameterizedQuery::new()
        .table_aliases([(Student::entity(), "s"), (ClassRoom::entity(), "s")])
        .unwrap_err();
    assert!(matches!(err, QueryError::AliasConflict { .. }));

    let again = ParameterizedQuery::new()
        .table_aliases([(Student::entity(), "s"), (Student::entity(), "s")])
        .unwrap();
    assert_eq!(again.aliases().len(), 1);
}

#[test]
fn test_column_alias_count_mismatch() {
    let err = school_query()
        .select(["s.Id", "s.FirstName", "s.LastName"])
        .unwrap()
        .column_aliases(["Id", "First"])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        QueryError::ColumnAliasCount {
            aliases: 2,
            columns: 3
        }
        .to_string()
    );
}

#[test]
fn test_aliased_select_list() {
    let built = school_query()
        .distinct()
        .select([SelectItem::from("s.Id"), SelectItem::Null])
        .unwrap()
        .column_aliases(["StudentId", "Remarks"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        built.parameterized_query,
        "select\n\
         \tdistinct\n\
         \ts.student_id       as StudentId,\n\
         \tnull               as Remarks\n\
         from\n\
         \tPQ_Student as s\n"
    );
}

#[test]
fn test_joins() {
    let built = school_query()
        .select(["s.Id", "c.Grade"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .inner_join(JoinSpec::key::<Student, ClassRoom>("ClassRoomId"))
        .unwrap()
        .left_join("c.Id == ct.ClassRoomId")
        .unwrap()
        .left_join(eq(col("ct.TeacherId"), col("t.Id")))
        .unwrap()
        .order_by(["c.Grade", "s.Id"])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        built.parameterized_query,
        "select\n\
         \ts.student_id,\n\
         \tc.grade\n\
         from\n\
         \tPQ_Student as s\n\
         \t\tinner join PQ_ClassRoom as c on\n\
         \t\t\ts.class_room_id = c.class_room_id\n\
         \t\tleft join PQ_ClassTeacherInfo as ct on\n\
         \t\t\tc.class_room_id = ct.class_room_id\n\
         \t\tleft join PQ_Teacher as t on\n\
         \t\t\tct.teacher_id = t.teacher_id\n\
         order by\n\
         \tc.grade,\n\
         \ts.student_id\n"
    );
}

#[test]
fn test_disjunctive_join_rejected() {
    let err = school_query()
        .left_join("c.Id == ct.ClassRoomId || c.Grade == ct.TeacherId")
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin(_)));
}

#[test]
fn test_date_literal_in_script() {
    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(lt(col("s.DateOfBirth"), ymd(2000, 1, 1)))
        .build()
        .unwrap();
    assert_eq!(where_block(&built.parameterized_query), "\ts.birth_date < @param_date_1\n");
    assert!(built.runnable_script.starts_with(
        "declare @param_date_1 datetime\n\nselect @param_date_1 = convert(datetime, '01-Jan-2000', 106)\n\n"
    ));
}

#[test]
fn test_captured_parameters_in_order() {
    let school = "Springfield";
    let age = 12;
    let built = school_query()
        .select([SelectItem::from("s.Id"), SelectItem::from(capture!(school))])
        .unwrap()
        .column_aliases(["", "School"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(gt(col("s.Id"), capture!(age)) & eq(col("s.LastName"), "Smith"))
        .build()
        .unwrap();
    let names: Vec<&str> = built
        .command
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["@param_school", "@param_age", "@param_value_1"]);
    assert!(built.runnable_script.contains("declare @param_age bigint\n"));
    assert!(built.runnable_script.contains("select @param_age = 12\n"));
}

#[test]
fn test_build_is_deterministic() {
    let build = || {
        let name = "Steve";
        school_query()
            .select(["s.Id", "s.FirstName"])
            .unwrap()
            .from::<Student>()
            .unwrap()
            .filter(eq(col("s.FirstName"), capture!(name)) | starts_with(col("s.LastName"), "Sm"))
            .build()
            .unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn test_crlf_line_endings() {
    let built = school_query()
        .with_options(BuildOptions::default().with_line_ending(LineEnding::Crlf))
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(eq(col("s.FirstName"), "Steve"))
        .build()
        .unwrap();
    for text in [&built.parameterized_query, &built.runnable_script] {
        assert!(text.ends_with("\r\n"));
        assert!(!text.replace("\r\n", "").contains('\n'));
    }
}

#[test]
fn test_order_by_requires_selected_column() {
    let err = school_query()
        .select(["s.Id"])
        .unwrap()
        .order_by(["s.LastName"])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Usage error: Only column names present in the \"select\" clause are allowed in the \"order by\" clause."
    );
}

#[test]
fn test_unknown_property() {
    let err = school_query()
        .select(["s.Surname"])
        .unwrap_err();
    assert!(matches!(err, QueryError::PropertyNotFound { .. }));
}

#[test]
fn test_null_captured_list_is_stripped() {
    let born_on: Option<Vec<chrono::NaiveDate>> = None;
    let built = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(gt(col("s.Id"), 0) & is_in(col("s.DateOfBirth"), capture!(born_on)))
        .build()
        .unwrap();
    assert_eq!(where_block(&built.parameterized_query), "\ts.student_id > 0\n");
    assert!(built.command.parameters.is_empty());
}

#[test]
fn test_variable_named_like_generated_parameter() {
    let err = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(eq(col("s.FirstName"), "Steve") & eq(col("s.LastName"), var("value_1", "Bob")))
        .build()
        .unwrap_err();
    assert!(matches!(err, QueryError::Usage(_)));
}

#[test]
fn test_non_finite_float_fails_build() {
    let err = school_query()
        .select(["s.Id"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .filter(gt(col("s.Id"), f64::NAN))
        .build()
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidValue(_)));
}

/// Derives names from the entity and property names: `tbl_` plus
/// snake case for tables, snake case for columns.
struct SnakeCaseResolver;

fn snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

impl MetadataResolver for SnakeCaseResolver {
    fn table_name(&self, entity: &EntitySchema) -> String {
        format!("tbl_{}", snake_case(&entity.name))
    }

    fn column_name(&self, entity: &EntitySchema, property: &str) -> QueryResult<String> {
        SchemaResolver.column_name(entity, property)?;
        Ok(snake_case(property))
    }

    fn data_kind(&self, entity: &EntitySchema, property: &str) -> QueryResult<DataKind> {
        SchemaResolver.data_kind(entity, property)
    }

    fn is_primary_key(&self, entity: &EntitySchema, property: &str) -> QueryResult<bool> {
        SchemaResolver.is_primary_key(entity, property)
    }

    fn primary_key(&self, entity: &EntitySchema) -> QueryResult<String> {
        SchemaResolver.primary_key(entity)
    }
}

#[test]
fn test_custom_resolver_naming() {
    let built = school_query()
        .with_resolver(SnakeCaseResolver)
        .select(["s.Id", "s.FirstName"])
        .unwrap()
        .from::<Student>()
        .unwrap()
        .inner_join(JoinSpec::key::<Student, ClassRoom>("ClassRoomId"))
        .unwrap()
        .filter(eq(col("s.FirstName"), "Steve"))
        .build()
        .unwrap();
    assert_eq!(
        built.parameterized_query,
        "select\n\
         \ts.id,\n\
         \ts.first_name\n\
         from\n\
         \ttbl_student as s\n\
         \t\tinner join tbl_class_room as c on\n\
         \t\t\ts.class_room_id = c.id\n\
         where\n\
         \ts.first_name = @param_value_1\n"
    );

    let err = school_query()
        .with_resolver(SnakeCaseResolver)
        .select(["s.Surname"])
        .unwrap_err();
    assert!(matches!(err, QueryError::PropertyNotFound { .. }));
}
