/*!

This is the long-form manual for `upward_eval` and `upeval`.

## Concepts

An upward evaluation survey asks collaborators to rate their direct supervisor
on a set of *competencies*, each one a short statement answered on a 1 to 5
scale. The competencies are then grouped into *criteria*: 11 core leadership
points and 6 additional relational categories in the built-in catalog
(`Catalog::standard()`).

The aggregation works in three steps:
1. every competency gets the average of the answers it received. Competencies
   that nobody answered are left out.
2. every criterion gets the mean of the averages of its competencies. Each
   competency weighs the same, regardless of how many people answered it.
3. the criteria are ranked from the best to the worst average, and each
   average is mapped to a status:

| Average   | Status            |
|-----------|-------------------|
| >= 4.5    | Excellent         |
| >= 4.0    | Good              |
| >= 3.0    | Regular           |
| >= 2.0    | Needs improvement |
| below 2.0 | Critical          |

The improvement areas are listed weakest first. Improvement areas with a
status of Regular or worse come with training recommendations.

## Assigning competencies to criteria

A competency may name its criterion explicitly with `criterionId`. The
comparison ignores case and accents, so `"Empatía"` selects `empatia`.
Otherwise the name and the description of the competency are matched
against the rules of the catalog:
- first, the name alone is compared to short labels (`"Comunicación"`,
  `"Trabajo en equipo"`, ...)
- then, keywords are searched in the full text, in a fixed order. For
  example, a statement that mentions both decisions and communication goes to
  `toma_decisiones` because that rule comes first.

Texts that match nothing go to the default criterion (`liderazgo` in the
built-in catalog).

A catalog can also be provided as a JSON file:

```text
{
  "version": "plant-2024",
  "criteria": [
    {"id": "liderazgo", "name": "Liderazgo", "category": "core_12"},
    {"id": "seguridad", "name": "Seguridad", "category": "core_12"}
  ],
  "defaultCriterion": "liderazgo",
  "rules": [
    {"kind": "keywords", "criterion": "seguridad", "patterns": ["riesgo", "accidente"]}
  ],
  "recommendations": {"seguridad": ["Cultura de seguridad"]}
}
```

When `rules` is missing, each criterion is matched by its id and its name.

## Input formats

The following formats are supported for responses:
* `json` the export of the document store
* `csv` one response per row
* `msforms_likert` Excel export of a Microsoft Forms 'Likert' question

### `json`

An array of response documents:

```text
[
  {
    "evaluatorId": "emp-001",
    "evaluatedId": "sup-01",
    "evaluatedName": "Ana Pérez",
    "department": "Producción",
    "shift": "Matutino",
    "answers": {"c1": 5, "c2": "4"},
    "comment": "Siempre está disponible."
  }
]
```

Answers are whole numbers between 1 and 5, written as numbers or as text.
Other values (`4.5`, `7`, `"often"`) are dropped with a warning. `null` means
that the competency was not answered.

### `csv`

The first row is the header. Answer columns are found by matching their
header with the id or the name of a competency. The other columns are
described with the `...ColumnIndex` options of the source.

```text
evaluator,supervisor,shift,c1,c2,comment
emp-001,sup-01,Matutino,5,4,Muy buen jefe
emp-002,sup-01,Nocturno,3,,
```

Empty cells are not answered.

### `msforms_likert`

Results from Microsoft Forms when using the 'Likert' input, in Excel (.xlsx)
format. Each statement is a column and each cell holds the label of the
selected option. The `choices` option lists the labels from the lowest to the
highest score:

```text
"choices": ["Nunca", "Casi nunca", "A veces", "Casi siempre", "Siempre"]
```

## Competencies

The competencies are read from a JSON array:

```text
[
  {"id": "c1", "name": "Comunicación", "order": 1},
  {"id": "c2", "name": "Pregunta 2", "description": "Reconoce mis logros", "order": 2,
   "levels": ["operativo"]},
  {"id": "c3", "name": "Retirada", "active": false}
]
```

Inactive competencies are ignored. When the source sets a `level`, only the
competencies for that organizational level are kept (a competency without
`levels` applies to all of them).

## Configuration

`upeval` reads a JSON configuration:

```text
{
  "outputSettings": {
    "reportTitle": "Evaluación ascendente",
    "period": "2024-S1",
    "organization": "Planta Norte",
    "outputDirectory": "reports",
    "reportFormat": "html",
    "byEvaluated": true
  },
  "responseSources": [
    {"provider": "csv", "filePath": "responses.csv",
     "evaluatorColumnIndex": "A", "evaluatedColumnIndex": 2}
  ],
  "competencySource": {"filePath": "competencies.json", "level": "operativo"},
  "catalogPath": "catalog.json",
  "rules": {"strengthsCount": 3, "improvementAreasCount": 3, "commentsLimit": 5}
}
```

Column and row indexes start at 1, and columns may also be written as Excel
letters (`"A"`, `"AB"`). Paths are relative to the configuration file.

The options of a response source:
 - `provider` (string): one of the input formats above.
 - `filePath` (string): the location of the file.
 - `evaluatedId` (string, optional): only keep the responses about this
   supervisor.
 - `firstAnswerColumnIndex` (optional, default 1): answer columns before this
   one are not considered.
 - `firstAnswerRowIndex` (optional, default 2): the first row with data. The
   header is always the first row.
 - `evaluatorColumnIndex`, `evaluatedColumnIndex`, `evaluatedNameColumnIndex`,
   `departmentColumnIndex`, `shiftColumnIndex`, `commentColumnIndex`
   (optional): the location of the metadata of each response. Without an
   evaluator column, every row gets its own generated id.
 - `excelWorksheetName` (string, optional): for Excel inputs, the name of the
   worksheet. Required when the workbook has more than one worksheet.
 - `choices` (array of strings, optional): the Likert labels, lowest first.

Without a configuration, the same settings can be passed on the command line
(`--input`, `--input-type`, `--competencies`, ...). See `upeval --help`.

## Reports

The report covers a `consolidated` target with all the responses, followed by
one target per evaluated supervisor when `byEvaluated` is set. It is written
as:
* `json` a summary (averages rounded to 2 decimals). This is also the format
  used to check the results against a reference with `--reference`.
* `text` one plain text page per target, separated by form feeds.
* `html` one page per target, ready to be printed.

 */
