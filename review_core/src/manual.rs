/*!

This is the long-form manual for `review_core` and `surveyrev`.

## Form revisions

Two revisions of the review form exist. The revision decides which columns
identify an item and which judgment is collected.

### `statusReview`

Items are identified by the hierarchical key
`sistema`, `ano`, `dimensao_padrao`, `subdimensao`, `questao`, `elemento`.

The reviewer picks one status:
* `approve`
* `reject`
* `suggest_wording`
* `new_item`: the text of the proposed item (`new_item_text`) becomes mandatory.

A free-text comment can be added.

### `adequacyReview`

Items are identified by `numero_questao`.

The reviewer gives:
* an adequacy: `adequate`, `partial` or `inadequate` (mandatory). With `partial`,
  a `justification` is mandatory.
* a relevance score from 1 to 5 (mandatory).
* an optional comment.

## Records

Every submission appends one record with the columns, in order:

| column        | content                                          |
|---------------|--------------------------------------------------|
| timestamp     | local time, `%Y-%m-%d %H:%M:%S`                  |
| reviewer      | the name typed by the reviewer                   |
| schema        | the revision tag                                 |
| (identity)    | the identity fields of the item                  |
| (context)     | `nivel`, `tipo_elemento`, `texto_completo`       |
| (judgment)    | `status`, `comment`, `new_item`, `new_item_text` |

For `adequacyReview` the judgment columns are `adequacy`, `relevance`,
`justification`, `comment`.

Records written before the `schema` column existed are read as records of the
active revision. Records of the other revision are ignored when looking for the
items already annotated: the two revisions identify items differently and no
mapping between them is attempted.

## Record stores

### `jsonDir`

One pretty-printed JSON file per record, in a directory created on the first
submission. The file name contains the reviewer and a digest of the item
identity, so submitting twice for the same item fails.

### `sheet`

A CSV sheet at `<path>/<tableName>/<sheetName>.csv`, created on the first
submission with the columns of that first record. Later records must fit in
these columns.

## Cell values

All the values are reduced to strings, numbers, booleans or null before being
written. Empty cells, `NaN` and similar markers become null. Integral numbers
are written as integers, so `4` and `4.0` identify the same item. A text cell
only becomes a number when the number prints back to the same text: codes
such as `01` or `1.10` keep their text and stay distinct from `1` and `1.1`.
*/
